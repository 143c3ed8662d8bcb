//! Form XObjects built from source pages
//!
//! Each source page is copied into the output document as a Form XObject
//! whose BBox is the page's MediaBox, so it can be drawn into a cell with a
//! single `cm` transform.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::layout::Rect;
use crate::types::PageEmbedError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

type EmbedResult<T> = std::result::Result<T, PageEmbedError>;

/// Page-tree depth at which inherited attribute lookup gives up
const MAX_INHERITANCE_DEPTH: usize = 32;

// =============================================================================
// XObject Creation
// =============================================================================

/// Create an XObject from a source page.
///
/// Objects reachable from the page's resources are copied once per source
/// document; `cache` maps source object ids to their copies and should be
/// kept for every page taken from the same document.
pub fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> EmbedResult<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let media_box = page_media_box(source, page_id)?;

    let content_data = get_page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(media_box.x),
            Object::Real(media_box.y),
            Object::Real(media_box.right()),
            Object::Real(media_box.top()),
        ]),
    );
    xobject_dict.set("FormType", Object::Integer(1));

    if let Some(resources) = inherited_attribute(source, page_dict, b"Resources") {
        xobject_dict.set(
            "Resources",
            copy_object_deep(output, source, resources, cache)?,
        );
    }

    Ok(output.add_object(Stream::new(xobject_dict, content_data)))
}

// =============================================================================
// Page Content Extraction
// =============================================================================

fn get_page_content(doc: &Document, page_dict: &Dictionary) -> EmbedResult<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()), // blank page
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(arr) => get_concatenated_content_streams(doc, arr),
            other => Ok(stream_bytes(other)),
        },
        Object::Array(arr) => get_concatenated_content_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

fn get_concatenated_content_streams(doc: &Document, refs: &[Object]) -> EmbedResult<Vec<u8>> {
    let mut result = Vec::new();

    for obj in refs {
        if let Object::Reference(id) = obj {
            result.extend_from_slice(&stream_bytes(doc.get_object(*id)?));
            result.push(b'\n');
        }
    }

    Ok(result)
}

fn stream_bytes(obj: &Object) -> Vec<u8> {
    match obj.as_stream() {
        Ok(stream) => stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
        Err(_) => Vec::new(),
    }
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// The output id is reserved before the referenced object is copied, so
/// reference cycles resolve to the reserved id instead of recursing forever.
/// A failed copy leaves neither cache entries nor objects behind.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> EmbedResult<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let referenced = source.get_object(*id)?;
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            match copy_object_deep(output, source, referenced, cache) {
                Ok(copied) => {
                    output.objects.insert(new_id, copied);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    // Ids are handed out in increasing order, so everything from
                    // `new_id` on belongs to this failed subtree
                    cache.retain(|_, copied| copied.0 < new_id.0);
                    output.objects.retain(|copied, _| copied.0 < new_id.0);
                    Err(err)
                }
            }
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            output, source, dict, cache,
        )?)),
        Object::Array(arr) => {
            let new_arr: EmbedResult<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: copy_dictionary(output, source, &stream.dict, cache)?,
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: None,
        })),
        _ => Ok(obj.clone()),
    }
}

fn copy_dictionary(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> EmbedResult<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        // Back-links into the source page tree are never needed by a form
        if key.as_slice() == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(new_dict)
}

// =============================================================================
// Page Dimensions
// =============================================================================

/// Source page MediaBox as a rect, following `/Parent` inheritance.
///
/// Pages without a usable MediaBox anywhere in their tree are treated as
/// US Letter at the origin.
pub fn page_media_box(doc: &Document, page_id: ObjectId) -> EmbedResult<Rect> {
    let page_dict = doc.get_dictionary(page_id)?;

    let media_box = inherited_attribute(doc, page_dict, b"MediaBox")
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .and_then(|values| parse_box(doc, values));

    Ok(media_box.unwrap_or_else(|| {
        Rect::new(0.0, 0.0, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1)
    }))
}

/// Get source page dimensions (width, height) in points
pub fn get_page_dimensions(doc: &Document, page_id: ObjectId) -> EmbedResult<(f32, f32)> {
    let media_box = page_media_box(doc, page_id)?;
    Ok((media_box.width, media_box.height))
}

fn parse_box(doc: &Document, values: &[Object]) -> Option<Rect> {
    if values.len() < 4 {
        return None;
    }
    let mut numbers = [0.0f32; 4];
    for (slot, value) in numbers.iter_mut().zip(values) {
        *slot = extract_number(resolve(doc, value)?)?;
    }
    let [llx, lly, urx, ury] = numbers;
    Some(Rect::new(
        llx.min(urx),
        lly.min(ury),
        (urx - llx).abs(),
        (ury - lly).abs(),
    ))
}

/// Look `key` up on the page, then on each ancestor in the page tree
fn inherited_attribute<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_dict;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
