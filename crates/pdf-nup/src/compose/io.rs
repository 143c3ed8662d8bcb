//! Document I/O for compositing

use crate::constants::MAX_DOCUMENT_BYTES;
use crate::group::{DocumentMeta, SourcePage};
use crate::render::get_page_dimensions;
use crate::types::*;
use chrono::{DateTime, Utc};
use lopdf::Document;
use std::path::Path;

/// One input document: sort metadata plus its raw bytes
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub meta: DocumentMeta,
    pub bytes: Vec<u8>,
}

impl InputDocument {
    pub fn new(meta: DocumentMeta, bytes: Vec<u8>) -> Self {
        Self { meta, bytes }
    }

    /// In-memory document, timestamped now
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(DocumentMeta::new(name, Utc::now()), bytes)
    }
}

/// Read one input document from disk.
///
/// The size ceiling is checked against the file metadata before any bytes
/// are read.
pub async fn read_input(path: impl AsRef<Path>) -> Result<InputDocument> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let metadata = tokio::fs::metadata(path).await?;
    check_size(&name, metadata.len())?;

    let last_modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let bytes = tokio::fs::read(path).await?;
    log::debug!("Read '{}' ({} bytes)", name, bytes.len());
    Ok(InputDocument::new(DocumentMeta::new(name, last_modified), bytes))
}

/// Read multiple input documents, in the given order
pub async fn read_inputs(paths: &[impl AsRef<Path>]) -> Result<Vec<InputDocument>> {
    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        inputs.push(read_input(path).await?);
    }
    Ok(inputs)
}

/// Load and parse a single PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let input = read_input(path).await?;
    let doc = tokio::task::spawn_blocking(move || {
        Document::load_mem(&input.bytes).map_err(|e| InputError::Unreadable {
            name: input.meta.name.clone(),
            reason: e.to_string(),
        })
    })
    .await??;
    Ok(doc)
}

/// Save a composed document
pub async fn save_pdf(mut doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || serialize(&mut doc)).await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

pub(crate) fn check_size(name: &str, size: u64) -> std::result::Result<(), InputError> {
    if size > MAX_DOCUMENT_BYTES {
        return Err(InputError::TooLarge {
            name: name.to_string(),
            size,
            limit: MAX_DOCUMENT_BYTES,
        });
    }
    Ok(())
}

pub(crate) fn serialize(doc: &mut Document) -> Result<Vec<u8>> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer)
        .map_err(|e| ComposeError::Serialization(e.to_string()))?;
    Ok(writer)
}

// =============================================================================
// Parsing
// =============================================================================

/// A parsed input document with its pages in document order
pub(crate) struct SourceDocument {
    pub document: Document,
    pub pages: Vec<SourcePage>,
}

pub(crate) fn parse_document(
    index: usize,
    input: &InputDocument,
) -> std::result::Result<SourceDocument, InputError> {
    let document = Document::load_mem(&input.bytes).map_err(|e| InputError::Unreadable {
        name: input.meta.name.clone(),
        reason: e.to_string(),
    })?;

    let pages = document
        .get_pages()
        .into_iter()
        .map(|(page_number, object_id)| {
            let (width, height) = get_page_dimensions(&document, object_id).unwrap_or_else(|e| {
                log::warn!(
                    "Page {} of '{}' has no readable size: {}",
                    page_number,
                    input.meta.name,
                    e
                );
                (0.0, 0.0)
            });
            SourcePage {
                document: index,
                page_number,
                object_id,
                width,
                height,
            }
        })
        .collect();

    Ok(SourceDocument { document, pages })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_ceiling() {
        assert!(check_size("ok.pdf", MAX_DOCUMENT_BYTES).is_ok());
        match check_size("big.pdf", MAX_DOCUMENT_BYTES + 1) {
            Err(InputError::TooLarge { name, limit, .. }) => {
                assert_eq!(name, "big.pdf");
                assert_eq!(limit, 50 * 1024 * 1024);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_unreadable() {
        let input = InputDocument::from_bytes("junk.pdf", b"not a pdf".to_vec());
        assert!(matches!(
            parse_document(0, &input),
            Err(InputError::Unreadable { .. })
        ));
    }
}
