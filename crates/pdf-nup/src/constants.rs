//! Shared constants for N-up compositing
//!
//! This module centralizes magic numbers and constants used throughout
//! the compositing process.

// =============================================================================
// Sheet Dimensions
// =============================================================================

/// Portrait output sheet (ISO A4 in points)
pub const PORTRAIT_SHEET: (f32, f32) = (595.0, 842.0);

/// Landscape output sheet (ISO A4 in points)
pub const LANDSCAPE_SHEET: (f32, f32) = (842.0, 595.0);

/// Source page size assumed when a page carries no MediaBox anywhere in its tree
/// (US Letter)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (612.0, 792.0);

// =============================================================================
// Input Limits
// =============================================================================

/// Largest accepted input document, in bytes (50 MiB)
pub const MAX_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024;

// =============================================================================
// User Ranges
// =============================================================================

/// Margin range offered to users (points)
pub const MARGIN_RANGE: (f32, f32) = (0.0, 50.0);

/// Per-cell scale range
pub const SCALE_RANGE: (f32, f32) = (0.1, 1.0);

/// Divider thickness range (points)
pub const THICKNESS_RANGE: (f32, f32) = (0.5, 5.0);

// =============================================================================
// Fallback Marker
// =============================================================================

/// Font size for the "failed to render" label (points)
pub const FALLBACK_FONT_SIZE: f32 = 12.0;

/// Line width of the outline drawn around a failed cell (points)
pub const FALLBACK_OUTLINE_WIDTH: f32 = 0.5;

/// Resource name of the fallback label font
pub const FALLBACK_FONT_NAME: &str = "F1";

// =============================================================================
// Preview
// =============================================================================

/// Reference source page used by the on-screen layout preview
pub const PREVIEW_SOURCE_SIZE: (f32, f32) = (1000.0, 2000.0);

// =============================================================================
// Progress
// =============================================================================

pub const PROGRESS_PREPARING: u8 = 10;
pub const PROGRESS_ANALYZING: u8 = 25;
pub const PROGRESS_READING_FILES: u8 = 40;
pub const PROGRESS_APPLYING_LAYOUT: u8 = 60;
pub const PROGRESS_ADDING_DIVIDERS: u8 = 80;
pub const PROGRESS_GENERATING: u8 = 95;
pub const PROGRESS_COMPLETED: u8 = 100;
