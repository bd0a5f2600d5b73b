use std::sync::Arc;
use std::time::Instant;
use viewport::{
    lock_viewport, EvolutionReport, GridDimensions, HttpSimulationService, Phase, RecordingSink,
    SimulationParameters, ViewportController,
};

/// Everything the command loop works on.
pub struct AppState {
    pub controller: ViewportController<HttpSimulationService>,
    pub failures: Arc<RecordingSink>,
    pub plain: bool,
    pub started_at: Instant,
    pub last_report: Option<EvolutionReport>,
}

impl AppState {
    pub fn new(
        controller: ViewportController<HttpSimulationService>,
        failures: Arc<RecordingSink>,
        plain: bool,
    ) -> Self {
        Self {
            controller,
            failures,
            plain,
            started_at: Instant::now(),
            last_report: None,
        }
    }

    pub fn status(&self) -> Status {
        let viewport = self.controller.viewport();
        let viewport = lock_viewport(&viewport);
        Status {
            phase: viewport.phase(),
            dimensions: viewport.grid().dimensions(),
            highlighted: viewport.grid().highlighted().len(),
            parameters: self.controller.parameters(),
            evolving: self.controller.is_evolving(),
            failures: self.failures.len(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Status {
    pub phase: Phase,
    pub dimensions: GridDimensions,
    pub highlighted: usize,
    pub parameters: SimulationParameters,
    pub evolving: bool,
    pub failures: usize,
    pub uptime_secs: u64,
}
