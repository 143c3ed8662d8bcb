//! Divider line rendering
//!
//! Produces the content-stream operations that stroke the lines between
//! grid cells.

use crate::layout::Line;
use crate::options::DividerStyle;

/// Generate divider strokes as PDF content stream operations.
///
/// Returns an empty string when the style is disabled or there are no
/// interior lines (1x1). A zero thickness strokes `0 w`, the thinnest line
/// the device can draw.
pub fn generate_dividers(style: &DividerStyle, lines: &[Line]) -> String {
    if !style.is_enabled() || lines.is_empty() {
        return String::new();
    }

    let color = style.rgb();
    let mut ops = String::new();

    // Save graphics state
    ops.push_str("q\n");
    ops.push_str(&format!("{} {} {} RG\n", color.r, color.g, color.b));
    ops.push_str(&format!("{} w\n", style.thickness));
    ops.push_str("[] 0 d\n"); // solid line

    for line in lines {
        ops.push_str(&format!(
            "{} {} m {} {} l S\n",
            line.start.x, line.start.y, line.end.x, line.end.y
        ));
    }

    // Restore graphics state
    ops.push_str("Q\n");

    ops
}
