//! Viewport state shared between the controller and running evolution tasks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::color::ColorResolver;
use crate::components::*;
use crate::grid::{GridRenderer, PaintReport};

pub type SharedViewport = Arc<Mutex<ViewportState>>;

/// Lock the viewport, recovering the state if a holder panicked.
pub fn lock_viewport(viewport: &SharedViewport) -> MutexGuard<'_, ViewportState> {
    viewport.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of handing a response to the viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Painted(PaintReport),
    /// A newer response has already been painted.
    Stale { ticket: Ticket, latest: Ticket },
}

/// The grid plus everything needed to apply responses in order.
pub struct ViewportState {
    grid: GridRenderer,
    phase: Phase,
    next_ticket: u64,
    last_applied: Option<Ticket>,
}

impl ViewportState {
    pub fn new(dimensions: GridDimensions) -> Self {
        Self::from_grid(GridRenderer::new(), dimensions)
    }

    pub fn with_resolver(dimensions: GridDimensions, resolver: Arc<dyn ColorResolver>) -> Self {
        Self::from_grid(GridRenderer::with_resolver(resolver), dimensions)
    }

    fn from_grid(mut grid: GridRenderer, dimensions: GridDimensions) -> Self {
        grid.rebuild_grid(dimensions.height, dimensions.width);
        Self {
            grid,
            phase: Phase::Idle,
            next_ticket: 0,
            last_applied: None,
        }
    }

    pub fn shared(self) -> SharedViewport {
        Arc::new(Mutex::new(self))
    }

    pub fn grid(&self) -> &GridRenderer {
        &self.grid
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            info!(from = %self.phase, to = %phase, "viewport phase changed");
            self.phase = phase;
        }
    }

    pub fn last_applied(&self) -> Option<Ticket> {
        self.last_applied
    }

    /// Hand out the next sequence ticket. Call before issuing the request.
    pub fn issue_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    pub fn rebuild_grid(&mut self, height: u32, width: u32) {
        self.grid.rebuild_grid(height, width);
    }

    /// Paint a response unless a response with a newer ticket was already painted.
    pub fn apply(&mut self, ticket: Ticket, individuals: &[Individual]) -> Applied {
        if let Some(latest) = self.last_applied {
            if ticket <= latest {
                debug!(ticket = ticket.0, latest = latest.0, "discarding stale response");
                return Applied::Stale { ticket, latest };
            }
        }
        self.last_applied = Some(ticket);
        Applied::Painted(self.grid.paint_individuals(individuals))
    }
}
