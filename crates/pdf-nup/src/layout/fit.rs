//! Content placement within cells
//!
//! A source page is scaled uniformly to fit its cell, multiplied by the
//! user scale, and centered.

use crate::types::PageEmbedError;

use super::{Placement, Rect};

/// Calculate where a source page of `src_width` x `src_height` is drawn
/// inside `cell`.
///
/// The scale is `min(cellW/srcW, cellH/srcH) * user_scale`, applied to both
/// axes. Pages with a zero, negative or non-finite side cannot be fitted and
/// are reported as [`PageEmbedError::DegenerateSize`].
pub fn fit_page(
    src_width: f32,
    src_height: f32,
    cell: &Rect,
    user_scale: f32,
) -> Result<Placement, PageEmbedError> {
    if !is_usable_side(src_width) || !is_usable_side(src_height) {
        return Err(PageEmbedError::DegenerateSize {
            width: src_width,
            height: src_height,
        });
    }

    let scale = fit_scale(src_width, src_height, cell.width, cell.height) * user_scale;
    let draw_width = src_width * scale;
    let draw_height = src_height * scale;

    let x = cell.x + (cell.width - draw_width) / 2.0;
    let y = cell.y + (cell.height - draw_height) / 2.0;

    Ok(Placement {
        rect: Rect::new(x, y, draw_width, draw_height),
        scale,
    })
}

/// Scale factor that fits source into target while preserving aspect ratio.
fn fit_scale(src_width: f32, src_height: f32, target_width: f32, target_height: f32) -> f32 {
    let scale_w = target_width / src_width;
    let scale_h = target_height / src_height;
    scale_w.min(scale_h)
}

fn is_usable_side(side: f32) -> bool {
    side.is_finite() && side > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_fit() {
        // Source is 800x600, target is 400x400: width-limited
        let scale = fit_scale(800.0, 600.0, 400.0, 400.0);
        assert!((scale - 0.5).abs() < 0.001);

        // Source is 400x800, target is 400x400: height-limited
        let scale = fit_scale(400.0, 800.0, 400.0, 400.0);
        assert!((scale - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_fit_is_centered() {
        let cell = Rect::new(10.0, 20.0, 400.0, 400.0);
        let placement = fit_page(800.0, 600.0, &cell, 1.0).unwrap();

        assert!((placement.rect.width - 400.0).abs() < 0.001);
        assert!((placement.rect.height - 300.0).abs() < 0.001);
        assert!((placement.rect.x - 10.0).abs() < 0.001);
        assert!((placement.rect.y - 70.0).abs() < 0.001);
    }

    #[test]
    fn test_user_scale_shrinks_around_center() {
        let cell = Rect::new(0.0, 0.0, 200.0, 200.0);
        let placement = fit_page(100.0, 100.0, &cell, 0.5).unwrap();

        assert!((placement.scale - 1.0).abs() < 0.001);
        assert_eq!(placement.rect, Rect::new(50.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn test_fit_never_exceeds_cell() {
        let cells = [
            Rect::new(10.0, 10.0, 287.5, 411.0),
            Rect::new(0.0, 0.0, 575.0, 822.0),
            Rect::new(5.0, 5.0, 191.7, 274.0),
            Rect::new(0.0, 0.0, 1.0, 1000.0),
        ];
        let sources = [
            (612.0, 792.0),
            (842.0, 595.0),
            (1.0, 5000.0),
            (5000.0, 1.0),
            (100.0, 100.0),
        ];
        let scales = [0.1, 0.5, 0.9, 1.0];

        for cell in &cells {
            for &(w, h) in &sources {
                for &s in &scales {
                    let placement = fit_page(w, h, cell, s).unwrap();
                    assert!(
                        cell.contains(&placement.rect, 0.01),
                        "{w}x{h} at {s} escaped {cell:?}: {:?}",
                        placement.rect
                    );
                    let ratio = placement.rect.width / placement.rect.height;
                    assert!(((ratio - w / h) / (w / h)).abs() < 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_degenerate_sizes_are_errors() {
        let cell = Rect::new(0.0, 0.0, 100.0, 100.0);
        for (w, h) in [(0.0, 100.0), (100.0, 0.0), (-5.0, 10.0), (f32::NAN, 10.0)] {
            match fit_page(w, h, &cell, 1.0) {
                Err(PageEmbedError::DegenerateSize { .. }) => {}
                other => panic!("expected DegenerateSize for {w}x{h}, got {other:?}"),
            }
        }
    }
}
