//! Grid layout calculation
//!
//! This module handles the geometric layout of the cell grid on a sheet:
//! sheet size, cell dimensions, cell rectangles and divider positions.

use crate::options::LayoutConfig;
use crate::types::{LayoutType, Orientation};

use super::{GridPosition, Line, LineAxis, Point, Rect};

// =============================================================================
// Sheet Geometry
// =============================================================================

/// Resolved geometry for every sheet of one composite run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetGeometry {
    /// Sheet width in points
    pub width: f32,
    /// Sheet height in points
    pub height: f32,
    /// Uniform margin around the grid in points
    pub margin: f32,
    /// Number of columns in the cell grid
    pub cols: usize,
    /// Number of rows in the cell grid
    pub rows: usize,
}

impl SheetGeometry {
    /// Resolve the geometry for a layout type, orientation and margin.
    pub fn new(layout_type: LayoutType, orientation: Orientation, margin: f32) -> Self {
        let (width, height) = orientation.sheet_size();
        let (cols, rows) = layout_type.grid_dimensions();
        Self {
            width,
            height,
            margin,
            cols,
            rows,
        }
    }

    pub fn from_config(config: &LayoutConfig) -> Self {
        Self::new(config.layout_type, config.orientation, config.margin)
    }

    /// Width of the area inside the margins
    pub fn inner_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Height of the area inside the margins
    pub fn inner_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }

    pub fn cell_width(&self) -> f32 {
        self.inner_width() / self.cols as f32
    }

    pub fn cell_height(&self) -> f32 {
        self.inner_height() / self.rows as f32
    }

    /// Total number of cells in the grid
    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Grid position of the cell at `index` in reading order
    /// (left to right, top to bottom).
    pub fn cell_position(&self, index: usize) -> GridPosition {
        GridPosition::new(index / self.cols, index % self.cols)
    }

    /// Rectangle of the cell at `index` in reading order.
    pub fn cell_rect(&self, index: usize) -> Rect {
        cell_bounds(self, self.cell_position(index))
    }

    /// Interior divider lines for the full grid.
    ///
    /// Vertical lines come first (left to right), then horizontal lines
    /// (bottom to top). A 1x1 grid has none.
    pub fn divider_lines(&self) -> Vec<Line> {
        let mut lines = Vec::with_capacity(self.cols + self.rows - 2);

        for i in 1..self.cols {
            let x = self.margin + self.inner_width() * (i as f32 / self.cols as f32);
            lines.push(Line {
                axis: LineAxis::Vertical,
                start: Point::new(x, self.margin),
                end: Point::new(x, self.height - self.margin),
            });
        }

        for i in 1..self.rows {
            let y = self.margin + self.inner_height() * (i as f32 / self.rows as f32);
            lines.push(Line {
                axis: LineAxis::Horizontal,
                start: Point::new(self.margin, y),
                end: Point::new(self.width - self.margin, y),
            });
        }

        lines
    }
}

// =============================================================================
// Cell Calculations
// =============================================================================

/// Calculate the bounds of a cell at the given grid position.
///
/// Row 0 is the top row, so the y coordinate is measured down from the
/// top margin in a bottom-left-origin space.
pub fn cell_bounds(geometry: &SheetGeometry, pos: GridPosition) -> Rect {
    let cell_width = geometry.cell_width();
    let cell_height = geometry.cell_height();

    let cell_x = geometry.margin + pos.col as f32 * cell_width;
    let cell_y = geometry.height - geometry.margin - (pos.row + 1) as f32 * cell_height;

    Rect::new(cell_x, cell_y, cell_width, cell_height)
}

// =============================================================================
// Tests
// =============================================================================
