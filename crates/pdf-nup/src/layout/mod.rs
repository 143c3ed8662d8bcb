//! Layout calculation modules for compositing
//!
//! This module handles all the geometric calculations for N-up sheets:
//! - Grid layout (sheet size, cell rectangles, divider positions)
//! - Content placement (aspect-preserving fit, centering)

mod fit;
mod grid;
mod types;

pub use fit::*;
pub use grid::*;
pub use types::*;
