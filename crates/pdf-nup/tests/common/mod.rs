#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdf_nup::*;

/// Shape of one page in a generated test document
#[derive(Debug, Clone, Copy)]
pub enum TestPage {
    /// A normal page with the given MediaBox size
    Sized(i64, i64),
    /// Zero-width MediaBox
    Degenerate,
    /// Resources point at an object that does not exist
    Broken,
}

/// Build a document whose page `i` draws a `% {label}-{i+1}` comment, so
/// tests can tell embedded pages apart.
pub fn create_test_pdf(label: &str, pages: &[TestPage]) -> Document {
    let mut doc = Document::with_version("1.7");

    // Create page tree root ID
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        let content = format!("% {}-{}\n0 0 m 10 10 l S\n", label, index + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let (width, height) = match page {
            TestPage::Sized(w, h) => (*w, *h),
            TestPage::Degenerate => (0, 792),
            TestPage::Broken => (612, 792),
        };
        let resources = match page {
            TestPage::Broken => Object::Reference((9999, 0)),
            _ => Object::Dictionary(Dictionary::new()),
        };

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ]),
            ),
            ("Resources", resources),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(pages.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));

    doc.trailer.set("Root", catalog_id);

    doc
}

pub fn pdf_bytes(label: &str, pages: &[TestPage]) -> Vec<u8> {
    let mut doc = create_test_pdf(label, pages);
    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    writer
}

/// `count` Letter-sized pages
pub fn letter_pages(count: usize) -> Vec<TestPage> {
    vec![TestPage::Sized(612, 792); count]
}

/// An input document named `label` modified `modified_secs` after the epoch
pub fn input(label: &str, pages: &[TestPage], modified_secs: i64) -> InputDocument {
    let meta = DocumentMeta::new(
        format!("{}.pdf", label),
        Utc.timestamp_opt(modified_secs, 0).unwrap(),
    );
    InputDocument::new(meta, pdf_bytes(label, pages))
}

pub fn ascending_upload_order() -> ComposeOptions {
    ComposeOptions {
        sort: SortConfig {
            sort_by: SortBy::UploadTime,
            sort_order: SortOrder::Asc,
        },
        ..Default::default()
    }
}

pub fn load_output(output: &ComposeOutput) -> Document {
    Document::load_mem(&output.bytes).unwrap()
}

/// Sheet page ids in output order
pub fn sheet_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// `(cell index, marker)` for every page drawn on a sheet
pub fn placed_markers(doc: &Document, sheet_id: ObjectId) -> Vec<(usize, String)> {
    let page = doc.get_dictionary(sheet_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();

    let mut markers: Vec<(usize, String)> = xobjects
        .iter()
        .map(|(name, value)| {
            let cell = std::str::from_utf8(&name[1..]).unwrap().parse().unwrap();
            let stream = doc
                .get_object(value.as_reference().unwrap())
                .unwrap()
                .as_stream()
                .unwrap();
            let content = String::from_utf8_lossy(&stream.content).into_owned();
            let marker = content
                .lines()
                .find_map(|line| line.strip_prefix("% "))
                .unwrap_or_default()
                .to_string();
            (cell, marker)
        })
        .collect();
    markers.sort();
    markers
}

/// Markers in cell order across all sheets
pub fn all_markers(doc: &Document) -> Vec<String> {
    sheet_ids(doc)
        .into_iter()
        .flat_map(|id| placed_markers(doc, id).into_iter().map(|(_, marker)| marker))
        .collect()
}

/// Decoded content stream of a sheet
pub fn sheet_content(doc: &Document, sheet_id: ObjectId) -> String {
    String::from_utf8_lossy(&doc.get_page_content(sheet_id).unwrap()).into_owned()
}

/// MediaBox `[x0 y0 x1 y1]` of a sheet as floats
pub fn sheet_size(doc: &Document, sheet_id: ObjectId) -> (f32, f32) {
    let page = doc.get_dictionary(sheet_id).unwrap();
    let values = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let number = |obj: &Object| match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        other => panic!("unexpected MediaBox entry {other:?}"),
    };
    (number(&values[2]), number(&values[3]))
}
