//! Transport to the simulation service.

use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::trace;

use crate::error::PollError;

pub type Query = Vec<(&'static str, String)>;

/// Raw GET access to the simulation service.
///
/// Implementations return the response body of a successful request; a
/// request that fails to complete or answers with a non-success status is a
/// `PollError::Network`.
pub trait SimulationService: Send + Sync + 'static {
    fn get(
        &self,
        endpoint: &'static str,
        query: Query,
    ) -> impl Future<Output = Result<String, PollError>> + Send;
}

/// `SimulationService` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSimulationService {
    client: Client,
    base_url: String,
}

impl HttpSimulationService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl SimulationService for HttpSimulationService {
    async fn get(&self, endpoint: &'static str, query: Query) -> Result<String, PollError> {
        let url = join_url(&self.base_url, endpoint);
        trace!(%url, ?query, "GET");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|err| PollError::network(endpoint, err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| PollError::network(endpoint, err))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(PollError::network(endpoint, format!("service answered {status}: {body}")))
        }
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
