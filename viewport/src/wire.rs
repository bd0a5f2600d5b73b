//! JSON shapes returned by the simulation service.
//!
//! Population endpoints answer with `{"coords": [x, y], "color": "..."}`
//! objects; step endpoints name the color key `hex_gene_sequence` instead;
//! older population endpoints answer with bare `[x, y]` pairs.

use serde::Deserialize;

use crate::components::Individual;
use crate::error::PollError;
use crate::poller::Update;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireIndividual {
    Keyed {
        coords: [i64; 2],
        #[serde(alias = "hex_gene_sequence")]
        color: String,
    },
    Bare([i64; 2]),
}

impl From<WireIndividual> for Individual {
    fn from(wire: WireIndividual) -> Self {
        match wire {
            WireIndividual::Keyed { coords: [x, y], color } => Individual::new(x, y, color),
            WireIndividual::Bare([x, y]) => Individual::new(x, y, format!("cell_{x}-{y}")),
        }
    }
}

/// Parse a response body that must be a JSON array of individuals.
pub fn parse_population(endpoint: &str, body: &str) -> Result<Vec<Individual>, PollError> {
    let wire: Vec<WireIndividual> =
        serde_json::from_str(body).map_err(|err| PollError::parse(endpoint, err))?;
    Ok(wire.into_iter().map(Individual::from).collect())
}

/// The answer an endpoint is documented to give.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Always a JSON array of individuals.
    Population,
    /// Usually plain text; a JSON array is still taken as a population.
    Acknowledgment,
}

/// Parse the answer to a settings push.
///
/// Population endpoints must answer with an array; any other body is a
/// `Parse` error.
pub fn parse_update(endpoint: &str, reply: Reply, body: &str) -> Result<Update, PollError> {
    match reply {
        Reply::Population => parse_population(endpoint, body).map(Update::Population),
        Reply::Acknowledgment if body.trim_start().starts_with('[') => {
            parse_population(endpoint, body).map(Update::Population)
        }
        Reply::Acknowledgment => Ok(Update::Acknowledged(body.trim().to_string())),
    }
}
