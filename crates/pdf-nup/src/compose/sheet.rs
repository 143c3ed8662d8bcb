//! Sheet assembly
//!
//! Each sheet is completed before the next one starts: its cells are drawn,
//! then its dividers, then its page object is written.

use super::io::SourceDocument;
use crate::group::SourcePage;
use crate::layout::{Line, Placement, Rect, SheetGeometry, fit_page};
use crate::options::LayoutConfig;
use crate::render::{SheetContent, create_page_xobject, generate_dividers, page_media_box};
use crate::types::PageEmbedError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

// =============================================================================
// Reports
// =============================================================================

/// What ended up in one grid cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    /// No page left for this cell (last sheet only)
    Empty,
    Drawn {
        page: SourcePage,
        placement: Placement,
    },
    /// The page could not be embedded and a marker was drawn instead
    Fallback {
        page: SourcePage,
        error: PageEmbedError,
    },
}

/// Per-sheet record of cells and dividers
#[derive(Debug, Clone, PartialEq)]
pub struct SheetReport {
    /// 0-based sheet index
    pub index: usize,
    /// One entry per grid cell, row-major from the top-left
    pub cells: Vec<CellOutcome>,
    /// Divider lines stroked on this sheet
    pub dividers: Vec<Line>,
}

impl SheetReport {
    pub fn drawn_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, CellOutcome::Drawn { .. }))
            .count()
    }

    pub fn blank_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, CellOutcome::Empty))
            .count()
    }
}

/// A page replaced by a fallback marker
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    pub sheet: usize,
    pub cell: usize,
    pub page: SourcePage,
    pub error: PageEmbedError,
}

/// Summary of a finished compositing run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComposeReport {
    pub source_pages: usize,
    pub sheets: Vec<SheetReport>,
}

impl ComposeReport {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Every page that fell back to a marker, in output order
    pub fn failures(&self) -> Vec<PageFailure> {
        self.sheets
            .iter()
            .flat_map(|sheet| {
                sheet
                    .cells
                    .iter()
                    .enumerate()
                    .filter_map(move |(cell, outcome)| match outcome {
                        CellOutcome::Fallback { page, error } => Some(PageFailure {
                            sheet: sheet.index,
                            cell,
                            page: *page,
                            error: error.clone(),
                        }),
                        _ => None,
                    })
            })
            .collect()
    }
}

// =============================================================================
// Compositor
// =============================================================================

/// A sheet whose cells are placed but which has no dividers or page object yet
struct SheetDraft {
    content: SheetContent,
    report: SheetReport,
}

/// Builds the output document sheet by sheet
pub(crate) struct Compositor<'a> {
    output: Document,
    sources: &'a [SourceDocument],
    layout: &'a LayoutConfig,
    geometry: SheetGeometry,
    pages_tree_id: ObjectId,
    /// Source-to-output object ids, one map per source document
    copy_caches: Vec<HashMap<ObjectId, ObjectId>>,
    page_refs: Vec<Object>,
}

impl<'a> Compositor<'a> {
    pub fn new(sources: &'a [SourceDocument], layout: &'a LayoutConfig) -> Self {
        let mut output = Document::with_version("1.7");
        let pages_tree_id = output.new_object_id();
        Self {
            output,
            sources,
            layout,
            geometry: SheetGeometry::from_config(layout),
            pages_tree_id,
            copy_caches: vec![HashMap::new(); sources.len()],
            page_refs: Vec::new(),
        }
    }

    /// Draw one chunk of pages as a complete sheet.
    ///
    /// `first_position` is the 0-based position of `chunk[0]` in the
    /// flattened page sequence; fallback labels number pages from it.
    pub fn add_sheet(
        &mut self,
        sheet_index: usize,
        chunk: &[SourcePage],
        first_position: usize,
    ) -> SheetReport {
        let draft = self.place_chunk(sheet_index, chunk, first_position);
        self.finish_sheet(draft)
    }

    fn place_chunk(
        &mut self,
        sheet_index: usize,
        chunk: &[SourcePage],
        first_position: usize,
    ) -> SheetDraft {
        let mut content = SheetContent::new();
        let mut cells = Vec::with_capacity(self.geometry.cell_count());

        for cell_index in 0..self.geometry.cell_count() {
            let Some(page) = chunk.get(cell_index) else {
                cells.push(CellOutcome::Empty);
                continue;
            };

            let cell = self.geometry.cell_rect(cell_index);
            let xobject_name = format!("P{}", cell_index);

            match self.embed(page, &cell, &xobject_name, &mut content) {
                Ok(placement) => cells.push(CellOutcome::Drawn {
                    page: *page,
                    placement,
                }),
                Err(error) => {
                    let position = first_position + cell_index + 1;
                    log::warn!(
                        "Page {} (document {} page {}) failed to render: {}",
                        position,
                        page.document,
                        page.page_number,
                        error
                    );
                    content.add_fallback_marker(&mut self.output, &cell, position);
                    cells.push(CellOutcome::Fallback {
                        page: *page,
                        error,
                    });
                }
            }
        }

        SheetDraft {
            content,
            report: SheetReport {
                index: sheet_index,
                cells,
                dividers: Vec::new(),
            },
        }
    }

    fn embed(
        &mut self,
        page: &SourcePage,
        cell: &Rect,
        xobject_name: &str,
        content: &mut SheetContent,
    ) -> Result<Placement, PageEmbedError> {
        let sources = self.sources;
        let source = sources
            .get(page.document)
            .ok_or_else(|| PageEmbedError::Malformed("unknown source document".to_string()))?;

        let media_box = page_media_box(&source.document, page.object_id)?;
        let placement = fit_page(media_box.width, media_box.height, cell, self.layout.scale)?;

        let cache = &mut self.copy_caches[page.document];
        let xobject_id =
            create_page_xobject(&mut self.output, &source.document, page.object_id, cache)?;
        content.place_xobject(xobject_name, xobject_id, &placement, &media_box);

        Ok(placement)
    }

    /// Add dividers to a placed sheet and write its page object.
    fn finish_sheet(&mut self, draft: SheetDraft) -> SheetReport {
        let SheetDraft {
            mut content,
            mut report,
        } = draft;

        if self.layout.divider_style.is_enabled() {
            let lines = self.geometry.divider_lines();
            let ops = generate_dividers(&self.layout.divider_style, &lines);
            if !ops.is_empty() {
                content.push_ops(ops);
                report.dividers = lines;
            }
        }

        let page_id = content.finish(
            &mut self.output,
            self.pages_tree_id,
            self.geometry.width,
            self.geometry.height,
        );
        self.page_refs.push(Object::Reference(page_id));

        report
    }

    /// Write the page tree and catalog and hand back the document
    pub fn into_document(mut self) -> Document {
        let count = self.page_refs.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.page_refs)),
            ("Count", Object::Integer(count)),
        ]);
        self.output
            .objects
            .insert(self.pages_tree_id, Object::Dictionary(pages_dict));

        let catalog_id = self.output.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_tree_id)),
        ]));

        self.output.trailer.set("Root", catalog_id);

        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orphan_page(page_number: u32) -> SourcePage {
        SourcePage {
            document: 7,
            page_number,
            object_id: (1, 0),
            width: 612.0,
            height: 792.0,
        }
    }

    fn written_streams(compositor: &Compositor) -> Vec<String> {
        compositor
            .output
            .objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .map(|stream| String::from_utf8_lossy(&stream.content).into_owned())
            .collect()
    }

    #[test]
    fn test_sheet_is_complete_before_the_next_starts() {
        let layout = LayoutConfig::default();
        let mut compositor = Compositor::new(&[], &layout);

        let first = compositor.add_sheet(0, &[orphan_page(1)], 0);
        assert_eq!(first.dividers.len(), 2);
        assert_eq!(compositor.page_refs.len(), 1);

        let streams = written_streams(&compositor);
        assert_eq!(streams.len(), 1);
        let marker = streams[0].find("(Page 1 failed to render)").unwrap();
        let last_divider = streams[0].rfind(" l S").unwrap();
        assert!(marker < last_divider);

        let second = compositor.add_sheet(1, &[orphan_page(1), orphan_page(2)], 4);
        assert_eq!(second.index, 1);
        assert_eq!(compositor.page_refs.len(), 2);

        let streams = written_streams(&compositor);
        assert_eq!(streams.len(), 2);
        assert!(
            streams
                .iter()
                .any(|s| s.contains("(Page 5 failed to render)") && s.contains("(Page 6 failed to render)"))
        );
    }
}
