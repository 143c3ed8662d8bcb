//! Output sheet rendering
//!
//! A [`SheetContent`] collects content-stream operations and resources for
//! one output sheet; [`SheetContent::finish`] writes the page object.

use crate::constants::{FALLBACK_FONT_NAME, FALLBACK_FONT_SIZE, FALLBACK_OUTLINE_WIDTH};
use crate::layout::{Placement, Rect};
use crate::types::Rgb;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Content and resources accumulated for one sheet
#[derive(Debug, Default)]
pub struct SheetContent {
    content_ops: Vec<String>,
    xobjects: Dictionary,
    fonts: Dictionary,
}

impl SheetContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw an embedded page XObject at `placement`.
    ///
    /// `media_box` is the source page's MediaBox; its lower-left corner is
    /// moved onto the placement origin.
    pub fn place_xobject(
        &mut self,
        xobject_name: &str,
        xobject_id: ObjectId,
        placement: &Placement,
        media_box: &Rect,
    ) {
        self.xobjects
            .set(xobject_name.as_bytes(), Object::Reference(xobject_id));
        self.content_ops.push(generate_placement_command(
            xobject_name,
            placement,
            media_box,
        ));
    }

    /// Draw the "failed to render" marker for a page that could not be placed.
    pub fn add_fallback_marker(&mut self, output: &mut Document, cell: &Rect, page_number: usize) {
        if !self.fonts.has(FALLBACK_FONT_NAME.as_bytes()) {
            let font_id = add_helvetica(output);
            self.fonts
                .set(FALLBACK_FONT_NAME.as_bytes(), Object::Reference(font_id));
        }
        self.content_ops
            .push(generate_fallback_marker(cell, page_number));
    }

    /// Append raw operations (dividers)
    pub fn push_ops(&mut self, ops: String) {
        if !ops.is_empty() {
            self.content_ops.push(ops);
        }
    }

    /// Write the sheet as a page under `parent_pages_id`.
    pub fn finish(
        self,
        output: &mut Document,
        parent_pages_id: ObjectId,
        sheet_width_pt: f32,
        sheet_height_pt: f32,
    ) -> ObjectId {
        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(parent_pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(sheet_width_pt),
                Object::Real(sheet_height_pt),
            ]),
        );

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(self.xobjects));
        if !self.fonts.is_empty() {
            resources.set("Font", Object::Dictionary(self.fonts));
        }

        let content = self.content_ops.join("");
        let content_id = output.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        output.add_object(page_dict)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Generate the PDF content stream command to place a page.
fn generate_placement_command(xobject_name: &str, placement: &Placement, media_box: &Rect) -> String {
    let scale = placement.scale;
    let tx = placement.rect.x - media_box.x * scale;
    let ty = placement.rect.y - media_box.y * scale;
    format!(
        "q {} 0 0 {} {} {} cm /{} Do Q\n",
        scale, scale, tx, ty, xobject_name
    )
}

/// Red outline around the cell plus a red label at its left edge, half-way up.
fn generate_fallback_marker(cell: &Rect, page_number: usize) -> String {
    let red = Rgb::RED;
    let mut ops = String::new();

    ops.push_str("q\n");
    ops.push_str(&format!("{} {} {} RG\n", red.r, red.g, red.b));
    ops.push_str(&format!("{} w\n", FALLBACK_OUTLINE_WIDTH));
    ops.push_str(&format!(
        "{} {} {} {} re S\n",
        cell.x, cell.y, cell.width, cell.height
    ));
    ops.push_str(&format!("{} {} {} rg\n", red.r, red.g, red.b));
    ops.push_str(&format!(
        "BT /{} {} Tf {} {} Td ({}) Tj ET\n",
        FALLBACK_FONT_NAME,
        FALLBACK_FONT_SIZE,
        cell.x,
        cell.center_y(),
        fallback_label(page_number)
    ));
    ops.push_str("Q\n");

    ops
}

/// Label drawn in place of a page that failed to render
pub fn fallback_label(page_number: usize) -> String {
    format!("Page {} failed to render", page_number)
}

fn add_helvetica(output: &mut Document) -> ObjectId {
    let mut font_dict = Dictionary::new();
    font_dict.set("Type", Object::Name(b"Font".to_vec()));
    font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
    font_dict.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    output.add_object(font_dict)
}
