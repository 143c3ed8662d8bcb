//! PDF rendering modules for compositing
//!
//! This module handles all PDF-specific operations:
//! - Creating XObjects from source pages
//! - Building output sheets (placements and fallback markers)
//! - Stroking divider lines
//! - Deep copying PDF objects

mod dividers;
mod page;
mod xobject;

pub use dividers::generate_dividers;
pub use page::{SheetContent, fallback_label};
pub use xobject::{copy_object_deep, create_page_xobject, get_page_dimensions, page_media_box};
