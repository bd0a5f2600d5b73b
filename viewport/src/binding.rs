//! Input Binding - routes control changes to the grid and the poller
//!
//! Every control event produces at most one request; there is no debouncing.
//! Whenever the service answers with a population the viewport repaints,
//! whichever control triggered the request.

use std::sync::Arc;
use tracing::{info, warn};

use crate::components::*;
use crate::config::ViewportConfig;
use crate::error::{ErrorSink, PollError};
use crate::evolution::{EvolutionReport, EvolutionRunner, EvolutionSchedule};
use crate::poller::{PopulationPoller, Setting, Update};
use crate::service::SimulationService;
use crate::state::{lock_viewport, Applied, SharedViewport, ViewportState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    GridHeight(u32),
    GridWidth(u32),
    PopulationSize(u32),
    Lifespan(u32),
    NumGenes(u32),
    NumGenerations(u32),
    MuteProbability(f64),
    MateProbability(f64),
    Start,
    Stop,
}

/// What handling a control event did to the viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rebuilt(GridDimensions),
    Applied(Applied),
    Acknowledged(String),
    EvolutionStarted,
    EvolutionStopped(Option<EvolutionReport>),
    /// The requested grid is too large; the current grid is kept.
    Rejected(GridDimensions),
    /// The request failed; the error was also sent to the sink.
    Failed(PollError),
}

pub struct ViewportController<S: SimulationService> {
    poller: Arc<PopulationPoller<S>>,
    viewport: SharedViewport,
    params: SimulationParameters,
    schedule: EvolutionSchedule,
    concurrency: usize,
    sync_world_size: bool,
    announce_start: bool,
    sink: Arc<dyn ErrorSink>,
    runner: EvolutionRunner,
}

impl<S: SimulationService> ViewportController<S> {
    pub fn new(service: S, config: &ViewportConfig, sink: Arc<dyn ErrorSink>) -> Self {
        let viewport = ViewportState::new(config.parameters.world()).shared();
        Self::with_viewport(service, config, sink, viewport)
    }

    pub fn with_viewport(
        service: S,
        config: &ViewportConfig,
        sink: Arc<dyn ErrorSink>,
        viewport: SharedViewport,
    ) -> Self {
        Self {
            poller: Arc::new(PopulationPoller::new(service)),
            viewport,
            params: config.parameters,
            schedule: config.schedule,
            concurrency: config.concurrency,
            sync_world_size: config.sync_world_size,
            announce_start: config.announce_start,
            sink,
            runner: EvolutionRunner::new(),
        }
    }

    pub fn viewport(&self) -> SharedViewport {
        Arc::clone(&self.viewport)
    }

    pub fn parameters(&self) -> SimulationParameters {
        self.params
    }

    pub fn poller(&self) -> &PopulationPoller<S> {
        &self.poller
    }

    pub fn is_evolving(&self) -> bool {
        self.runner.is_running()
    }

    /// Lay out the grid and fetch the first population.
    pub async fn initialize(&mut self) -> Outcome {
        {
            let mut viewport = lock_viewport(&self.viewport);
            viewport.rebuild_grid(self.params.world_height, self.params.world_width);
            viewport.set_phase(Phase::AwaitingInitialPopulation);
        }
        self.refresh_population().await
    }

    pub async fn handle(&mut self, event: ControlEvent) -> Outcome {
        match event {
            ControlEvent::GridHeight(height) => {
                self.resize(GridDimensions::new(height, self.params.world_width)).await
            }
            ControlEvent::GridWidth(width) => {
                self.resize(GridDimensions::new(self.params.world_height, width)).await
            }
            ControlEvent::PopulationSize(size) => {
                self.params.population_size = size;
                self.enter_polling();
                self.refresh_population().await
            }
            ControlEvent::Lifespan(lifespan) => {
                self.params.lifespan = lifespan;
                self.push(Setting::Lifespan(lifespan)).await
            }
            ControlEvent::NumGenes(num_genes) => {
                self.params.num_genes = num_genes;
                self.push(Setting::NumGenes(num_genes)).await
            }
            ControlEvent::NumGenerations(generations) => {
                self.push(Setting::NumGenerations(generations)).await
            }
            ControlEvent::MuteProbability(p) => self.push(Setting::MuteProbability(p)).await,
            ControlEvent::MateProbability(p) => self.push(Setting::MateProbability(p)).await,
            ControlEvent::Start => self.start().await,
            ControlEvent::Stop => Outcome::EvolutionStopped(self.runner.stop().await),
        }
    }

    /// Wait for a running evolution sequence to finish.
    pub async fn wait_for_evolution(&mut self) -> Option<EvolutionReport> {
        self.runner.wait().await
    }

    pub async fn shutdown(&mut self) -> Option<EvolutionReport> {
        self.runner.stop().await
    }

    async fn resize(&mut self, dimensions: GridDimensions) -> Outcome {
        if !dimensions.fits() {
            warn!(%dimensions, max = GridDimensions::MAX_CELLS, "grid too large, keeping current size");
            return Outcome::Rejected(dimensions);
        }
        self.params.world_height = dimensions.height;
        self.params.world_width = dimensions.width;
        lock_viewport(&self.viewport).rebuild_grid(dimensions.height, dimensions.width);
        info!(%dimensions, "grid resized");

        if self.sync_world_size {
            let ticket = self.ticket();
            match self
                .poller
                .push_world_size(dimensions.height, dimensions.width)
                .await
            {
                Ok(Update::Population(individuals)) => {
                    self.apply(ticket, &individuals);
                }
                Ok(Update::Acknowledged(_)) => {}
                Err(err) => self.sink.report("world size", &err),
            }
        }
        Outcome::Rebuilt(dimensions)
    }

    async fn refresh_population(&mut self) -> Outcome {
        let ticket = self.ticket();
        let result = self.poller.request_population_update(&self.params).await;
        self.leave_polling();
        match result {
            Ok(individuals) => Outcome::Applied(self.apply(ticket, &individuals)),
            Err(err) => self.fail("population update", err),
        }
    }

    async fn push(&mut self, setting: Setting) -> Outcome {
        let ticket = self.ticket();
        match self.poller.push_setting(setting).await {
            Ok(Update::Population(individuals)) => Outcome::Applied(self.apply(ticket, &individuals)),
            Ok(Update::Acknowledged(ack)) => Outcome::Acknowledged(ack),
            Err(err) => self.fail(setting.endpoint(), err),
        }
    }

    async fn start(&mut self) -> Outcome {
        if let Some(previous) = self.runner.stop().await {
            info!(dispatched = previous.dispatched, "previous evolution run ended");
        }

        if self.announce_start {
            match self.poller.announce_start().await {
                Ok(ack) => info!(%ack, "service acknowledged start"),
                Err(err) => self.sink.report("start", &err),
            }
        }

        self.runner.start(
            Arc::clone(&self.poller),
            Arc::clone(&self.viewport),
            Arc::clone(&self.sink),
            self.schedule,
            self.concurrency,
        );
        Outcome::EvolutionStarted
    }

    fn ticket(&self) -> Ticket {
        lock_viewport(&self.viewport).issue_ticket()
    }

    fn apply(&self, ticket: Ticket, individuals: &[Individual]) -> Applied {
        lock_viewport(&self.viewport).apply(ticket, individuals)
    }

    fn fail(&self, context: &str, err: PollError) -> Outcome {
        self.sink.report(context, &err);
        Outcome::Failed(err)
    }

    fn enter_polling(&self) {
        let mut viewport = lock_viewport(&self.viewport);
        if viewport.phase() == Phase::Idle {
            viewport.set_phase(Phase::Polling);
        }
    }

    fn leave_polling(&self) {
        let mut viewport = lock_viewport(&self.viewport);
        match viewport.phase() {
            Phase::Polling | Phase::AwaitingInitialPopulation => viewport.set_phase(Phase::Idle),
            Phase::Evolving if !self.runner.is_running() => {
                warn!("viewport marked evolving without a running sequence");
                viewport.set_phase(Phase::Idle);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordingSink;
    use crate::fake::ScriptedService;
    use crate::poller::endpoints;

    fn config() -> ViewportConfig {
        ViewportConfig {
            parameters: SimulationParameters {
                population_size: 3,
                lifespan: 60,
                num_genes: 6,
                world_height: 5,
                world_width: 5,
            },
            schedule: EvolutionSchedule {
                generations: 2,
                steps_per_generation: 3,
            },
            ..ViewportConfig::default()
        }
    }

    fn service() -> ScriptedService {
        ScriptedService::new(|endpoint, query| match endpoint {
            endpoints::UPDATE_POPULATION => {
                let size: i64 = query[0].1.parse().unwrap();
                let individuals: Vec<String> = (0..size)
                    .map(|i| format!(r#"{{"coords": [{i}, {i}], "color": "c{i}"}}"#))
                    .collect();
                Ok(format!("[{}]", individuals.join(",")))
            }
            endpoints::UPDATE_NUM_GENES => Ok(r#"[{"coords": [4, 0], "color": "n"}]"#.into()),
            endpoints::EVOLVE_STEP => Ok(r#"[{"coords": [1, 2], "hex_gene_sequence": "e"}]"#.into()),
            endpoints::START => Ok("Genesis".into()),
            other => Ok(format!("{other} ok")),
        })
    }

    fn highlighted(controller: &ViewportController<ScriptedService>) -> Vec<CellPos> {
        lock_viewport(&controller.viewport())
            .grid()
            .highlighted()
            .into_iter()
            .map(|(pos, _)| pos)
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_paints_first_population() {
        let mut controller = ViewportController::new(service(), &config(), Arc::new(RecordingSink::new()));
        let outcome = controller.initialize().await;

        assert!(matches!(outcome, Outcome::Applied(Applied::Painted(ref r)) if r.painted == 3));
        assert_eq!(
            highlighted(&controller),
            vec![CellPos::new(0, 0), CellPos::new(1, 1), CellPos::new(2, 2)]
        );
        assert_eq!(lock_viewport(&controller.viewport()).phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_population_size_repaints() {
        let mut controller = ViewportController::new(service(), &config(), Arc::new(RecordingSink::new()));
        controller.initialize().await;
        controller.handle(ControlEvent::PopulationSize(5)).await;

        assert_eq!(controller.parameters().population_size, 5);
        assert_eq!(highlighted(&controller).len(), 5);
        let calls = controller.poller().service().calls_to(endpoints::UPDATE_POPULATION);
        assert_eq!(calls.last().unwrap().param("pop_size"), Some("5"));
    }

    #[tokio::test]
    async fn test_grid_resize_rebuilds_and_tracks_world() {
        let mut controller = ViewportController::new(service(), &config(), Arc::new(RecordingSink::new()));
        controller.initialize().await;

        let outcome = controller.handle(ControlEvent::GridHeight(2)).await;
        assert_eq!(outcome, Outcome::Rebuilt(GridDimensions::new(2, 5)));
        let outcome = controller.handle(ControlEvent::GridWidth(8)).await;
        assert_eq!(outcome, Outcome::Rebuilt(GridDimensions::new(2, 8)));

        assert_eq!(lock_viewport(&controller.viewport()).grid().cell_count(), 16);
        assert!(highlighted(&controller).is_empty());

        // resize alone does not talk to the service
        assert!(controller.poller().service().calls_to(endpoints::UPDATE_WORLD_SIZE).is_empty());

        // the next population request carries the new world size
        controller.handle(ControlEvent::PopulationSize(4)).await;
        let calls = controller.poller().service().calls_to(endpoints::UPDATE_POPULATION);
        let last = calls.last().unwrap();
        assert_eq!(last.param("worldY"), Some("2"));
        assert_eq!(last.param("worldX"), Some("8"));
        // (2,2) and (3,3) fall outside the 2x8 grid
        assert_eq!(highlighted(&controller), vec![CellPos::new(0, 0), CellPos::new(1, 1)]);
    }

    #[tokio::test]
    async fn test_oversized_grid_is_rejected() {
        let mut controller = ViewportController::new(service(), &config(), Arc::new(RecordingSink::new()));
        controller.initialize().await;

        assert_eq!(
            controller.handle(ControlEvent::GridHeight(1000)).await,
            Outcome::Rebuilt(GridDimensions::new(1000, 5))
        );
        let outcome = controller.handle(ControlEvent::GridWidth(100_000)).await;
        assert_eq!(outcome, Outcome::Rejected(GridDimensions::new(1000, 100_000)));

        assert_eq!(controller.parameters().world(), GridDimensions::new(1000, 5));
        assert_eq!(lock_viewport(&controller.viewport()).grid().cell_count(), 5000);
    }

    #[tokio::test]
    async fn test_sync_world_size_pushes_dimensions() {
        let config = ViewportConfig {
            sync_world_size: true,
            ..config()
        };
        let mut controller = ViewportController::new(service(), &config, Arc::new(RecordingSink::new()));
        controller.handle(ControlEvent::GridWidth(9)).await;

        let calls = controller.poller().service().calls_to(endpoints::UPDATE_WORLD_SIZE);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].param("worldY"), Some("5"));
        assert_eq!(calls[0].param("worldX"), Some("9"));
    }

    #[tokio::test]
    async fn test_repaint_follows_response_shape() {
        let mut controller = ViewportController::new(service(), &config(), Arc::new(RecordingSink::new()));
        controller.initialize().await;

        let outcome = controller.handle(ControlEvent::Lifespan(90)).await;
        assert_eq!(outcome, Outcome::Acknowledged("update_lifespan ok".into()));
        assert_eq!(highlighted(&controller).len(), 3);
        assert_eq!(controller.parameters().lifespan, 90);

        let outcome = controller.handle(ControlEvent::NumGenes(9)).await;
        assert!(matches!(outcome, Outcome::Applied(Applied::Painted(_))));
        assert_eq!(highlighted(&controller), vec![CellPos::new(4, 0)]);

        let outcome = controller.handle(ControlEvent::MuteProbability(0.001)).await;
        assert_eq!(outcome, Outcome::Acknowledged("update_mute_probability ok".into()));
    }

    #[tokio::test]
    async fn test_failures_reach_the_sink() {
        let service = ScriptedService::new(|endpoint, _| Err(PollError::network(endpoint, "refused")));
        let sink = Arc::new(RecordingSink::new());
        let mut controller = ViewportController::new(service, &config(), sink.clone());

        let outcome = controller.initialize().await;
        assert!(matches!(outcome, Outcome::Failed(PollError::Network { .. })));
        let outcome = controller.handle(ControlEvent::Lifespan(10)).await;
        assert!(matches!(outcome, Outcome::Failed(_)));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[1].context, "update_lifespan");
        assert_eq!(lock_viewport(&controller.viewport()).phase(), Phase::Idle);
        assert_eq!(lock_viewport(&controller.viewport()).grid().cell_count(), 25);
    }

    #[tokio::test]
    async fn test_start_runs_schedule() {
        let mut controller = ViewportController::new(service(), &config(), Arc::new(RecordingSink::new()));
        controller.initialize().await;

        assert_eq!(controller.handle(ControlEvent::Start).await, Outcome::EvolutionStarted);
        let report = controller.wait_for_evolution().await.unwrap();
        assert_eq!(report.dispatched, 6);
        assert_eq!(report.painted, 6);

        let service = controller.poller().service();
        assert_eq!(service.calls_to(endpoints::START).len(), 1);
        assert_eq!(service.calls_to(endpoints::EVOLVE_STEP).len(), 6);
        assert_eq!(highlighted(&controller), vec![CellPos::new(1, 2)]);
        assert_eq!(lock_viewport(&controller.viewport()).phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_shutdown_after_finished_run_is_not_a_cancel() {
        let mut controller = ViewportController::new(service(), &config(), Arc::new(RecordingSink::new()));
        controller.handle(ControlEvent::Start).await;
        while controller.is_evolving() {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        let report = controller.shutdown().await.expect("report");
        assert_eq!(report.dispatched, 6);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_failed_start_announcement_still_evolves() {
        let service = ScriptedService::new(|endpoint, _| match endpoint {
            endpoints::START => Err(PollError::network(endpoint, "service answered 404 Not Found")),
            _ => Ok("[]".into()),
        });
        let sink = Arc::new(RecordingSink::new());
        let mut controller = ViewportController::new(service, &config(), sink.clone());

        controller.handle(ControlEvent::Start).await;
        let report = controller.wait_for_evolution().await.unwrap();
        assert_eq!(report.dispatched, 6);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].context, "start");
    }

    #[tokio::test]
    async fn test_stop_without_run() {
        let mut controller = ViewportController::new(service(), &config(), Arc::new(RecordingSink::new()));
        assert_eq!(controller.handle(ControlEvent::Stop).await, Outcome::EvolutionStopped(None));
    }
}
