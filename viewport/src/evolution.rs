//! Evolution Runner - background task that walks the generation/step schedule
//!
//! Each step request takes a sequence ticket when it is dispatched; the
//! viewport only paints a response newer than the last one it painted. At
//! most `concurrency` requests are in flight, and a run can be cancelled.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{info, warn};

use crate::components::{Individual, Phase, Ticket};
use crate::error::{ErrorSink, PollError};
use crate::poller::PopulationPoller;
use crate::service::SimulationService;
use crate::state::{lock_viewport, Applied, SharedViewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionSchedule {
    pub generations: u32,
    pub steps_per_generation: u32,
}

impl EvolutionSchedule {
    pub fn len(&self) -> usize {
        self.generations as usize * self.steps_per_generation as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(generation, step)` pairs in dispatch order.
    pub fn steps(&self) -> impl Iterator<Item = (u32, u32)> {
        let steps = self.steps_per_generation;
        (0..self.generations).flat_map(move |generation| (0..steps).map(move |step| (generation, step)))
    }
}

impl Default for EvolutionSchedule {
    fn default() -> Self {
        Self {
            generations: 100,
            steps_per_generation: 60,
        }
    }
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvolutionReport {
    pub dispatched: u32,
    pub painted: u32,
    pub stale: u32,
    pub failed: u32,
    pub cancelled: bool,
}

type StepResult = (u32, u32, Ticket, Result<Vec<Individual>, PollError>);

pub struct EvolutionRunner {
    is_running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: Option<JoinHandle<EvolutionReport>>,
}

impl EvolutionRunner {
    pub fn new() -> Self {
        Self {
            is_running: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            task: None,
        }
    }

    /// Start walking `schedule` on the current tokio runtime.
    ///
    /// Does nothing if a run is already in progress; stop it first.
    pub fn start<S: SimulationService>(
        &mut self,
        poller: Arc<PopulationPoller<S>>,
        viewport: SharedViewport,
        sink: Arc<dyn ErrorSink>,
        schedule: EvolutionSchedule,
        concurrency: usize,
    ) {
        if self.is_running() {
            warn!("evolution run already in progress");
            return;
        }

        let concurrency = concurrency.max(1);
        info!(
            generations = schedule.generations,
            steps = schedule.steps_per_generation,
            concurrency,
            "starting evolution run"
        );
        self.is_running.store(true, Ordering::Release);
        lock_viewport(&viewport).set_phase(Phase::Evolving);

        let running = Arc::clone(&self.is_running);
        let wake = Arc::clone(&self.wake);

        let task = tokio::spawn(async move {
            let mut report = EvolutionReport::default();
            let mut in_flight: JoinSet<StepResult> = JoinSet::new();

            'schedule: for (generation, step) in schedule.steps() {
                while in_flight.len() >= concurrency {
                    tokio::select! {
                        joined = in_flight.join_next() => {
                            if let Some(joined) = joined.filter(|_| running.load(Ordering::Acquire)) {
                                settle(joined, &viewport, &*sink, &mut report);
                            }
                        }
                        _ = wake.notified() => {}
                    }
                    if !running.load(Ordering::Acquire) {
                        break 'schedule;
                    }
                }
                if !running.load(Ordering::Acquire) {
                    break;
                }

                let ticket = lock_viewport(&viewport).issue_ticket();
                let poller = Arc::clone(&poller);
                in_flight.spawn(async move {
                    let result = poller.advance_step(generation, step).await;
                    (generation, step, ticket, result)
                });
                report.dispatched += 1;
            }

            while running.load(Ordering::Acquire) && !in_flight.is_empty() {
                tokio::select! {
                    joined = in_flight.join_next() => {
                        if let Some(joined) = joined.filter(|_| running.load(Ordering::Acquire)) {
                            settle(joined, &viewport, &*sink, &mut report);
                        }
                    }
                    _ = wake.notified() => {}
                }
            }

            if !in_flight.is_empty() || (report.dispatched as usize) < schedule.len() {
                report.cancelled = true;
                in_flight.abort_all();
                while in_flight.join_next().await.is_some() {}
            }

            running.store(false, Ordering::Release);
            lock_viewport(&viewport).set_phase(Phase::Idle);
            info!(
                dispatched = report.dispatched,
                painted = report.painted,
                stale = report.stale,
                failed = report.failed,
                cancelled = report.cancelled,
                "evolution run finished"
            );
            report
        });

        self.task = Some(task);
    }

    /// Cancel the run and wait for it to wind down.
    pub async fn stop(&mut self) -> Option<EvolutionReport> {
        let task = self.task.take()?;
        info!("stopping evolution run");
        self.is_running.store(false, Ordering::Release);
        self.wake.notify_one();
        join_report(task.await)
    }

    /// Wait for the run to finish on its own.
    pub async fn wait(&mut self) -> Option<EvolutionReport> {
        let task = self.task.take()?;
        join_report(task.await)
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }
}

impl Default for EvolutionRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EvolutionRunner {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn join_report(joined: Result<EvolutionReport, JoinError>) -> Option<EvolutionReport> {
    match joined {
        Ok(report) => Some(report),
        Err(err) => {
            warn!(%err, "evolution task ended abnormally");
            None
        }
    }
}

fn settle(
    joined: Result<StepResult, JoinError>,
    viewport: &SharedViewport,
    sink: &dyn ErrorSink,
    report: &mut EvolutionReport,
) {
    match joined {
        Ok((_, _, ticket, Ok(individuals))) => {
            match lock_viewport(viewport).apply(ticket, &individuals) {
                Applied::Painted(_) => report.painted += 1,
                Applied::Stale { .. } => report.stale += 1,
            }
        }
        Ok((generation, step, _, Err(err))) => {
            report.failed += 1;
            sink.report(&format!("evolve step {generation}/{step}"), &err);
        }
        Err(err) => {
            report.failed += 1;
            warn!(%err, "evolve step task did not complete");
        }
    }
}
