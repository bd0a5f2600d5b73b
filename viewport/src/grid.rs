//! Grid Renderer - cells live as entities in an ECS world
//!
//! Every cell is an entity carrying a `CellPos` and a `Fill`. Resizing tears
//! the whole world down and spawns a fresh set of cells.

use hecs::{Entity, World};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::color::{ColorResolver, HashColor};
use crate::components::*;
use crate::error::RenderError;

/// Outcome of one paint pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaintReport {
    pub painted: usize,
    pub skipped: Vec<RenderError>,
}

pub struct GridRenderer {
    world: World,
    index: HashMap<CellPos, Entity>,
    dimensions: GridDimensions,
    resolver: Arc<dyn ColorResolver>,
}

impl GridRenderer {
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(HashColor))
    }

    pub fn with_resolver(resolver: Arc<dyn ColorResolver>) -> Self {
        Self {
            world: World::new(),
            index: HashMap::new(),
            dimensions: GridDimensions::default(),
            resolver,
        }
    }

    /// Remove every cell and lay out a fresh `height x width` grid.
    pub fn rebuild_grid(&mut self, height: u32, width: u32) {
        self.world.clear();
        self.index.clear();
        self.dimensions = GridDimensions::new(height, width);
        self.index.reserve(self.dimensions.cell_count());

        for row in 0..height {
            for col in 0..width {
                let pos = CellPos { row, col };
                let entity = self.world.spawn((pos, Fill::Background));
                self.index.insert(pos, entity);
            }
        }

        debug!(dimensions = %self.dimensions, cells = self.index.len(), "grid rebuilt");
    }

    /// Reset every cell, then paint each individual at its coordinates.
    ///
    /// Individuals without a matching cell are skipped and reported; they
    /// never touch any other cell.
    pub fn paint_individuals(&mut self, individuals: &[Individual]) -> PaintReport {
        for (_, fill) in self.world.query_mut::<&mut Fill>() {
            *fill = Fill::Background;
        }

        let mut report = PaintReport::default();
        for individual in individuals {
            let (x, y) = individual.coordinates;
            let Some(entity) = self
                .dimensions
                .locate(x, y)
                .and_then(|pos| self.index.get(&pos).copied())
            else {
                report.skipped.push(RenderError::MissingCell { row: x, col: y });
                continue;
            };

            let color = self.resolver.resolve(&individual.color_key);
            match self.world.query_one_mut::<&mut Fill>(entity) {
                Ok(fill) => {
                    *fill = Fill::Painted(color);
                    report.painted += 1;
                }
                Err(_) => report.skipped.push(RenderError::MissingCell { row: x, col: y }),
            }
        }

        if let Some(first) = report.skipped.first() {
            warn!(
                skipped = report.skipped.len(),
                dimensions = %self.dimensions,
                first = %first,
                "individuals outside the grid were not painted"
            );
        }
        report
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    pub fn cell_count(&self) -> usize {
        self.world.query::<&CellPos>().iter().count()
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<Fill> {
        let entity = self.index.get(&CellPos { row, col })?;
        self.world.get::<&Fill>(*entity).ok().map(|fill| *fill)
    }

    /// Every existing cell address, row-major.
    pub fn positions(&self) -> Vec<CellPos> {
        let mut positions: Vec<CellPos> = self
            .world
            .query::<&CellPos>()
            .iter()
            .map(|(_, pos)| *pos)
            .collect();
        positions.sort_unstable();
        positions
    }

    /// Painted cells, row-major.
    pub fn highlighted(&self) -> Vec<(CellPos, Color)> {
        let mut cells: Vec<(CellPos, Color)> = self
            .world
            .query::<(&CellPos, &Fill)>()
            .iter()
            .filter_map(|(_, (pos, fill))| match fill {
                Fill::Painted(color) => Some((*pos, *color)),
                Fill::Background => None,
            })
            .collect();
        cells.sort_unstable_by_key(|(pos, _)| *pos);
        cells
    }

    /// Snapshot of the grid as rows of fills.
    pub fn rows(&self) -> Vec<Vec<Fill>> {
        if self.dimensions.cell_count() == 0 {
            return Vec::new();
        }
        let mut rows =
            vec![vec![Fill::Background; self.dimensions.width as usize]; self.dimensions.height as usize];
        for (_, (pos, fill)) in self.world.query::<(&CellPos, &Fill)>().iter() {
            rows[pos.row as usize][pos.col as usize] = *fill;
        }
        rows
    }

    /// Plain text frame: `#` for painted cells, `.` for background.
    pub fn render_text(&self) -> String {
        self.rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|fill| if fill.is_painted() { '#' } else { '.' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self::new()
    }
}
