//! Evolution Viewport
//!
//! Client-side viewport for a remote evolution simulation: keeps a grid of
//! addressable cells, polls the simulation service and paints the returned
//! individuals onto the grid.

pub mod binding;
pub mod color;
pub mod components;
pub mod config;
pub mod error;
pub mod evolution;
pub mod grid;
pub mod poller;
pub mod service;
pub mod state;
pub mod wire;

#[cfg(test)]
pub(crate) mod fake;

pub use binding::{ControlEvent, Outcome, ViewportController};
pub use color::{ColorResolver, HashColor};
pub use components::*;
pub use config::{ConfigError, ViewportConfig};
pub use error::{ErrorSink, FailureRecord, LogSink, PollError, RecordingSink, RenderError};
pub use evolution::{EvolutionReport, EvolutionRunner, EvolutionSchedule};
pub use grid::{GridRenderer, PaintReport};
pub use poller::{PopulationPoller, Setting, Update};
pub use service::{HttpSimulationService, SimulationService};
pub use state::{lock_viewport, Applied, SharedViewport, ViewportState};
