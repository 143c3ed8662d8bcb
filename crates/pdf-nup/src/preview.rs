use crate::compose::{InputDocument, composite};
use crate::constants::PREVIEW_SOURCE_SIZE;
use crate::job::JobContext;
use crate::layout::SheetGeometry;
use crate::options::{ComposeOptions, LayoutConfig};
use crate::types::*;
use lopdf::Document;

/// Sheet layout expressed in percentages, for drawing a scaled preview
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewGeometry {
    /// Sheet width divided by sheet height
    pub sheet_aspect: f32,
    /// Margin as a percentage of the sheet width, applied on all sides
    pub margin_percent: f32,
    pub cols: usize,
    pub rows: usize,
    /// Drawn page width as a percentage of its cell width
    pub draw_width_percent: f32,
    /// Drawn page height as a percentage of its cell height
    pub draw_height_percent: f32,
    /// Divider stroke width; zero when dividers are off
    pub divider_thickness: f32,
    pub divider_color: Rgb,
}

/// Preview geometry for the reference source page (1000 x 2000).
pub fn preview_geometry(layout: &LayoutConfig) -> PreviewGeometry {
    preview_geometry_for(layout, PREVIEW_SOURCE_SIZE.0, PREVIEW_SOURCE_SIZE.1)
}

/// Preview geometry for a source page of the given size.
///
/// The percentages match what [`crate::layout::fit_page`] draws: when the
/// cell is relatively narrower than the source the page fills `scale` of
/// the cell width, otherwise `scale` of the cell height.
pub fn preview_geometry_for(layout: &LayoutConfig, src_width: f32, src_height: f32) -> PreviewGeometry {
    let geometry = SheetGeometry::from_config(layout);
    let cell_width = geometry.cell_width().max(0.0);
    let cell_height = geometry.cell_height().max(0.0);

    let (draw_width_percent, draw_height_percent) =
        if cell_width > 0.0 && cell_height > 0.0 && src_width > 0.0 && src_height > 0.0 {
            let cell_aspect = cell_width / cell_height;
            let source_aspect = src_width / src_height;
            let scale = layout.scale;
            if cell_aspect <= source_aspect {
                (
                    scale * 100.0,
                    (1.0 / source_aspect) * scale * cell_aspect * 100.0,
                )
            } else {
                (
                    source_aspect * scale * (1.0 / cell_aspect) * 100.0,
                    scale * 100.0,
                )
            }
        } else {
            (0.0, 0.0)
        };

    let style = &layout.divider_style;
    PreviewGeometry {
        sheet_aspect: geometry.width / geometry.height,
        margin_percent: layout.margin / geometry.width * 100.0,
        cols: geometry.cols,
        rows: geometry.rows,
        draw_width_percent,
        draw_height_percent,
        divider_thickness: if style.is_enabled() { style.thickness } else { 0.0 },
        divider_color: style.rgb(),
    }
}

/// Generate a preview of the composite.
/// Returns a document with at most `max_sheets` sheets (at least one).
pub async fn generate_preview(
    inputs: &[InputDocument],
    options: &ComposeOptions,
    max_sheets: usize,
) -> Result<Document> {
    let (document, report) =
        composite(inputs, options, &JobContext::new(), Some(max_sheets.max(1))).await?;
    log::debug!(
        "Preview with {} of {} pages",
        report
            .sheets
            .iter()
            .map(|sheet| sheet.cells.len() - sheet.blank_cells())
            .sum::<usize>(),
        report.source_pages
    );
    Ok(document)
}
