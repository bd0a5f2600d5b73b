//! In-memory `SimulationService` for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::PollError;
use crate::service::{Query, SimulationService};

type Responder = dyn Fn(&str, &Query) -> Result<String, PollError> + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub endpoint: String,
    pub query: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone)]
pub struct ScriptedService {
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<Call>>>,
    latency: Option<Duration>,
}

impl ScriptedService {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &Query) -> Result<String, PollError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
            latency: None,
        }
    }

    /// Answers every population endpoint with an empty array.
    pub fn empty() -> Self {
        Self::new(|_, _| Ok("[]".to_string()))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.endpoint == endpoint)
            .collect()
    }
}

impl SimulationService for ScriptedService {
    async fn get(&self, endpoint: &'static str, query: Query) -> Result<String, PollError> {
        self.calls.lock().unwrap().push(Call {
            endpoint: endpoint.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        (self.responder)(endpoint, &query)
    }
}
