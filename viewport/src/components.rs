//! Value types shared by the grid, the poller and the controller.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Grid
// ============================================================================

/// Address of a cell inside the current grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: u32,
    pub col: u32,
}

impl CellPos {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridDimensions {
    pub height: u32,
    pub width: u32,
}

impl GridDimensions {
    /// Largest grid the viewport will lay out.
    pub const MAX_CELLS: usize = 1_000_000;

    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn cell_count(&self) -> usize {
        self.height as usize * self.width as usize
    }

    pub fn fits(&self) -> bool {
        self.cell_count() <= Self::MAX_CELLS
    }

    /// Map a signed coordinate pair onto a cell, if it lies inside the grid.
    pub fn locate(&self, x: i64, y: i64) -> Option<CellPos> {
        let row = u32::try_from(x).ok()?;
        let col = u32::try_from(y).ok()?;
        (row < self.height && col < self.width).then_some(CellPos { row, col })
    }
}

impl fmt::Display for GridDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Cell component: what a cell currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fill {
    #[default]
    Background,
    Painted(Color),
}

impl Fill {
    pub fn is_painted(&self) -> bool {
        matches!(self, Fill::Painted(_))
    }
}

// ============================================================================
// Population
// ============================================================================

/// One individual as reported by the simulation service.
///
/// `coordinates.0` addresses the grid row, `coordinates.1` the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Individual {
    pub coordinates: (i64, i64),
    pub color_key: String,
}

impl Individual {
    pub fn new(x: i64, y: i64, color_key: impl Into<String>) -> Self {
        Self {
            coordinates: (x, y),
            color_key: color_key.into(),
        }
    }
}

/// Client-side mirror of the service's population settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub population_size: u32,
    pub lifespan: u32,
    pub num_genes: u32,
    pub world_height: u32,
    pub world_width: u32,
}

impl SimulationParameters {
    pub fn world(&self) -> GridDimensions {
        GridDimensions::new(self.world_height, self.world_width)
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            population_size: 80,
            lifespan: 60,
            num_genes: 6,
            world_height: 150,
            world_width: 150,
        }
    }
}

// ============================================================================
// Sequencing
// ============================================================================

/// Monotonic sequence number attached to every population-bearing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingInitialPopulation,
    Polling,
    Evolving,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingInitialPopulation => "awaiting-initial-population",
            Phase::Polling => "polling",
            Phase::Evolving => "evolving",
        };
        f.write_str(name)
    }
}
