//! Layout data types for compositing
//!
//! These types represent the intermediate geometry between page grouping
//! and PDF rendering.

/// Position within the grid (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    /// Row index (0 = top row)
    pub row: usize,
    /// Column index (0 = leftmost column)
    pub col: usize,
}

impl GridPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A rectangular area in points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Center y coordinate
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Whether `other` lies inside this rect, allowing `tolerance` points of slack
    pub fn contains(&self, other: &Rect, tolerance: f32) -> bool {
        other.x >= self.x - tolerance
            && other.y >= self.y - tolerance
            && other.right() <= self.right() + tolerance
            && other.top() <= self.top() + tolerance
    }
}

/// A point in sheet space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Orientation of a divider line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAxis {
    Vertical,
    Horizontal,
}

/// A straight divider stroke between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub axis: LineAxis,
    pub start: Point,
    pub end: Point,
}

/// Where a source page is drawn inside its cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Drawn rectangle in sheet space
    pub rect: Rect,
    /// Uniform scale applied to the source page
    pub scale: f32,
}
