//! Error types and the sink poll failures are reported to.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::warn;

/// Failure of a single request to the simulation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("request to /{endpoint} failed: {message}")]
    Network { endpoint: String, message: String },
    #[error("malformed response from /{endpoint}: {message}")]
    Parse { endpoint: String, message: String },
}

impl PollError {
    pub fn network(endpoint: &str, message: impl ToString) -> Self {
        Self::Network {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    pub fn parse(endpoint: &str, message: impl ToString) -> Self {
        Self::Parse {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::Network { endpoint, .. } | Self::Parse { endpoint, .. } => endpoint,
        }
    }
}

/// A coordinate that has no cell in the current grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("no cell at ({row}, {col})")]
    MissingCell { row: i64, col: i64 },
}

/// Receives every poll failure. Reporting never interrupts the pipeline.
pub trait ErrorSink: Send + Sync {
    fn report(&self, context: &str, error: &PollError);
}

/// Logs failures and forgets them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, context: &str, error: &PollError) {
        warn!(context, %error, "simulation request failed");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub at: DateTime<Utc>,
    pub context: String,
    pub error: PollError,
}

/// Logs failures and keeps them for later inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<FailureRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FailureRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<FailureRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, context: &str, error: &PollError) {
        LogSink.report(context, error);
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailureRecord {
                at: Utc::now(),
                context: context.to_string(),
                error: error.clone(),
            });
    }
}
