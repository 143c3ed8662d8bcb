use crate::options::LayoutConfig;
use crate::types::*;
use lopdf::Document;

/// Number of sheets needed for `source_pages` pages
pub fn sheet_count(source_pages: usize, layout_type: LayoutType) -> usize {
    source_pages.div_ceil(layout_type.cells_per_sheet())
}

/// Calculate statistics for the composite
pub fn calculate_statistics(documents: &[Document], layout: &LayoutConfig) -> Result<NupStatistics> {
    let source_pages = documents.iter().map(|doc| doc.get_pages().len()).sum();
    statistics_for_pages(source_pages, layout.layout_type)
}

/// Statistics for a known page count
pub fn statistics_for_pages(source_pages: usize, layout_type: LayoutType) -> Result<NupStatistics> {
    if source_pages == 0 {
        return Err(InputError::NoPages.into());
    }

    let cells_per_sheet = layout_type.cells_per_sheet();
    let output_sheets = sheet_count(source_pages, layout_type);

    Ok(NupStatistics {
        source_pages,
        output_sheets,
        cells_per_sheet,
        blank_cells: output_sheets * cells_per_sheet - source_pages,
    })
}
