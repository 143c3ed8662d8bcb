use crate::constants::{LANDSCAPE_SHEET, PORTRAIT_SHEET};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Failed to serialize output document: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Compositing was cancelled")]
    Cancelled,
}

/// Fatal problems with the supplied documents, raised before any sheet is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("No documents to compose")]
    NoDocuments,
    #[error("No pages to compose")]
    NoPages,
    #[error("Document '{name}' is {size} bytes, over the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("Document '{name}' could not be read: {reason}")]
    Unreadable { name: String, reason: String },
}

/// A single source page that could not be placed on its sheet.
///
/// These never abort a job; the affected cell gets a fallback marker instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageEmbedError {
    #[error("page has degenerate size {width}x{height}")]
    DegenerateSize { width: f32, height: f32 },
    #[error("page could not be embedded: {0}")]
    Malformed(String),
}

impl From<lopdf::Error> for PageEmbedError {
    fn from(err: lopdf::Error) -> Self {
        PageEmbedError::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Sheet orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Orientation {
    /// Portrait: 595 x 842 points
    #[default]
    Portrait,
    /// Landscape: 842 x 595 points
    Landscape,
}

impl Orientation {
    /// Fixed output sheet size (width, height) in points.
    pub fn sheet_size(self) -> (f32, f32) {
        match self {
            Orientation::Portrait => PORTRAIT_SHEET,
            Orientation::Landscape => LANDSCAPE_SHEET,
        }
    }
}

/// Grid shapes supported on one output sheet, named columns x rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutType {
    #[cfg_attr(feature = "serde", serde(rename = "1x1"))]
    OneByOne,
    #[cfg_attr(feature = "serde", serde(rename = "2x1"))]
    TwoByOne,
    #[cfg_attr(feature = "serde", serde(rename = "1x2"))]
    OneByTwo,
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "2x2"))]
    TwoByTwo,
    #[cfg_attr(feature = "serde", serde(rename = "3x3"))]
    ThreeByThree,
}

impl LayoutType {
    pub const ALL: [LayoutType; 5] = [
        LayoutType::OneByOne,
        LayoutType::TwoByOne,
        LayoutType::OneByTwo,
        LayoutType::TwoByTwo,
        LayoutType::ThreeByThree,
    ];

    /// Grid dimensions as (cols, rows)
    pub fn grid_dimensions(self) -> (usize, usize) {
        match self {
            LayoutType::OneByOne => (1, 1),
            LayoutType::TwoByOne => (2, 1),
            LayoutType::OneByTwo => (1, 2),
            LayoutType::TwoByTwo => (2, 2),
            LayoutType::ThreeByThree => (3, 3),
        }
    }

    /// Number of source pages that fit on one sheet
    pub fn cells_per_sheet(self) -> usize {
        let (cols, rows) = self.grid_dimensions();
        cols * rows
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutType::OneByOne => "1x1",
            LayoutType::TwoByOne => "2x1",
            LayoutType::OneByTwo => "1x2",
            LayoutType::TwoByTwo => "2x2",
            LayoutType::ThreeByThree => "3x3",
        }
    }
}

impl std::fmt::Display for LayoutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayoutType {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        LayoutType::ALL
            .into_iter()
            .find(|layout| layout.as_str() == s.trim())
            .ok_or_else(|| ComposeError::Config(format!("Unknown layout type '{}'", s)))
    }
}

/// Divider line style between cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum DividerKind {
    /// No dividers
    None,
    /// Lines between cells only
    #[default]
    Cross,
    /// Same interior lines as `Cross`
    Grid,
}

/// Document sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum SortBy {
    /// Extracted metadata date, falling back to last-modified time
    Date,
    /// Document display name
    Name,
    /// Last-modified time
    #[default]
    UploadTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// RGB color with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional). Anything else is black.
    pub fn from_hex(hex: &str) -> Self {
        Self::try_from_hex(hex).unwrap_or(Rgb::BLACK)
    }

    fn try_from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .ok()
                .map(|v| f32::from(v) / 255.0)
        };
        Some(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Statistics about a composite run
#[derive(Debug, Clone, PartialEq)]
pub struct NupStatistics {
    /// Total number of source pages
    pub source_pages: usize,
    /// Number of output sheets
    pub output_sheets: usize,
    /// Cells on each sheet
    pub cells_per_sheet: usize,
    /// Empty cells on the last sheet
    pub blank_cells: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        assert_eq!(Rgb::from_hex("#000000"), Rgb::BLACK);
        assert_eq!(Rgb::from_hex("ff0000"), Rgb::RED);

        let c = Rgb::from_hex("#3366CC");
        assert!((c.r - 0.2).abs() < 0.001);
        assert!((c.g - 0.4).abs() < 0.001);
        assert!((c.b - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_bad_hex_is_black() {
        assert_eq!(Rgb::from_hex(""), Rgb::BLACK);
        assert_eq!(Rgb::from_hex("#abc"), Rgb::BLACK);
        assert_eq!(Rgb::from_hex("#gg0000"), Rgb::BLACK);
        assert_eq!(Rgb::from_hex("#é0000"), Rgb::BLACK);
    }

    #[test]
    fn test_layout_type_round_trip_names() {
        for layout in LayoutType::ALL {
            assert_eq!(layout.as_str().parse::<LayoutType>().unwrap(), layout);
        }
        assert!("4x4".parse::<LayoutType>().is_err());
    }
}
