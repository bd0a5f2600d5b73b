//! Population Poller - turns simulation parameters into service requests

use tracing::debug;

use crate::components::{Individual, SimulationParameters};
use crate::error::PollError;
use crate::service::SimulationService;
use crate::wire::{parse_population, parse_update, Reply};

pub mod endpoints {
    pub const UPDATE_POPULATION: &str = "update_population";
    pub const EVOLVE_STEP: &str = "evolve_step";
    pub const UPDATE_WORLD_SIZE: &str = "update_world_size";
    pub const UPDATE_LIFESPAN: &str = "update_lifespan";
    pub const UPDATE_NUM_GENES: &str = "update_num_genes";
    pub const UPDATE_NUM_GENERATIONS: &str = "update_num_generations";
    pub const UPDATE_MUTE_PROBABILITY: &str = "update_mute_probability";
    pub const UPDATE_MATE_PROBABILITY: &str = "update_mate_probability";
    pub const START: &str = "action/start";
}

/// What the service answered to a settings push.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// The service sent back the whole population; the viewport repaints.
    Population(Vec<Individual>),
    /// Plain acknowledgment; nothing to repaint.
    Acknowledged(String),
}

impl Update {
    pub fn individuals(&self) -> Option<&[Individual]> {
        match self {
            Update::Population(individuals) => Some(individuals),
            Update::Acknowledged(_) => None,
        }
    }
}

/// A single service-side setting pushed on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting {
    Lifespan(u32),
    NumGenes(u32),
    NumGenerations(u32),
    MuteProbability(f64),
    MateProbability(f64),
}

impl Setting {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Setting::Lifespan(_) => endpoints::UPDATE_LIFESPAN,
            Setting::NumGenes(_) => endpoints::UPDATE_NUM_GENES,
            Setting::NumGenerations(_) => endpoints::UPDATE_NUM_GENERATIONS,
            Setting::MuteProbability(_) => endpoints::UPDATE_MUTE_PROBABILITY,
            Setting::MateProbability(_) => endpoints::UPDATE_MATE_PROBABILITY,
        }
    }

    pub fn reply(&self) -> Reply {
        match self {
            Setting::NumGenes(_) => Reply::Population,
            _ => Reply::Acknowledgment,
        }
    }

    fn query(&self) -> (&'static str, String) {
        match *self {
            Setting::Lifespan(value) => ("lifespan", value.to_string()),
            Setting::NumGenes(value) => ("num_genes", value.to_string()),
            Setting::NumGenerations(value) => ("num_generations", value.to_string()),
            Setting::MuteProbability(value) => ("mute_probability", value.to_string()),
            Setting::MateProbability(value) => ("mate_probability", value.to_string()),
        }
    }
}

pub struct PopulationPoller<S> {
    service: S,
}

impl<S: SimulationService> PopulationPoller<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Create or resize the remote population.
    pub async fn request_population_update(
        &self,
        params: &SimulationParameters,
    ) -> Result<Vec<Individual>, PollError> {
        let query = vec![
            ("pop_size", params.population_size.to_string()),
            ("lifespan", params.lifespan.to_string()),
            ("worldY", params.world_height.to_string()),
            ("worldX", params.world_width.to_string()),
            ("num_genes", params.num_genes.to_string()),
        ];
        let body = self.service.get(endpoints::UPDATE_POPULATION, query).await?;
        let individuals = parse_population(endpoints::UPDATE_POPULATION, &body)?;
        debug!(count = individuals.len(), "population updated");
        Ok(individuals)
    }

    /// Advance the remote simulation by one step of one generation.
    pub async fn advance_step(
        &self,
        generation_idx: u32,
        step_idx: u32,
    ) -> Result<Vec<Individual>, PollError> {
        let query = vec![
            ("generationIdx", generation_idx.to_string()),
            ("stepIdx", step_idx.to_string()),
        ];
        let body = self.service.get(endpoints::EVOLVE_STEP, query).await?;
        parse_population(endpoints::EVOLVE_STEP, &body)
    }

    pub async fn push_lifespan(&self, lifespan: u32) -> Result<Update, PollError> {
        self.push_setting(Setting::Lifespan(lifespan)).await
    }

    pub async fn push_num_genes(&self, num_genes: u32) -> Result<Update, PollError> {
        self.push_setting(Setting::NumGenes(num_genes)).await
    }

    pub async fn push_setting(&self, setting: Setting) -> Result<Update, PollError> {
        let endpoint = setting.endpoint();
        let body = self.service.get(endpoint, vec![setting.query()]).await?;
        let update = parse_update(endpoint, setting.reply(), &body)?;
        debug!(?setting, repaint = update.individuals().is_some(), "setting pushed");
        Ok(update)
    }

    pub async fn push_world_size(&self, height: u32, width: u32) -> Result<Update, PollError> {
        let query = vec![("worldY", height.to_string()), ("worldX", width.to_string())];
        let body = self.service.get(endpoints::UPDATE_WORLD_SIZE, query).await?;
        parse_update(endpoints::UPDATE_WORLD_SIZE, Reply::Acknowledgment, &body)
    }

    /// Tell the service an evolution run is starting. Returns its acknowledgment.
    pub async fn announce_start(&self) -> Result<String, PollError> {
        let body = self.service.get(endpoints::START, Vec::new()).await?;
        Ok(body.trim().to_string())
    }
}
