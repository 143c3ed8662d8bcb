//! Page ordering and chunking
//!
//! Documents (not individual pages) are sorted by the configured key, their
//! pages are flattened in that order, and the result is cut into one chunk
//! per output sheet.

use crate::options::SortConfig;
use crate::types::{LayoutType, SortBy, SortOrder};
use chrono::{DateTime, NaiveDate, Utc};
use lopdf::ObjectId;
use std::cmp::Ordering;

/// Sort metadata for one input document, extracted before compositing.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    /// Display name (usually the file name)
    pub name: String,
    /// Last-modified / upload time
    pub last_modified: DateTime<Utc>,
    /// Date found in the document's content, if any
    pub metadata_date: Option<String>,
}

impl DocumentMeta {
    pub fn new(name: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            last_modified,
            metadata_date: None,
        }
    }

    pub fn with_metadata_date(mut self, date: impl Into<String>) -> Self {
        self.metadata_date = Some(date.into());
        self
    }

    /// Key used by [`SortBy::Date`]: the metadata date when it parses,
    /// otherwise the last-modified time, as Unix milliseconds.
    pub fn date_key(&self) -> i64 {
        match self.metadata_date.as_deref() {
            Some(raw) => parse_metadata_date(raw).unwrap_or_else(|| {
                log::debug!(
                    "Unrecognized metadata date '{}' on '{}', using last-modified time",
                    raw,
                    self.name
                );
                self.last_modified.timestamp_millis()
            }),
            None => self.last_modified.timestamp_millis(),
        }
    }
}

/// One page of one input document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePage {
    /// Index of the owning document in the caller's input list
    pub document: usize,
    /// 1-based page number within that document
    pub page_number: u32,
    /// Page object in the owning document
    pub object_id: ObjectId,
    /// Intrinsic width in points
    pub width: f32,
    /// Intrinsic height in points
    pub height: f32,
}

/// Formats accepted for metadata dates, tried in order after RFC 3339
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%Y年%m月%d日"];

fn parse_metadata_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.timestamp_millis());
    }
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|datetime| datetime.and_utc().timestamp_millis())
    })
}

// =============================================================================
// Ordering
// =============================================================================

/// Compare two documents under `sort`. Equal keys compare `Equal` in both
/// orders so a stable sort keeps input order for ties.
pub fn compare_documents(a: &DocumentMeta, b: &DocumentMeta, sort: &SortConfig) -> Ordering {
    let ordering = match sort.sort_by {
        SortBy::Name => a.name.cmp(&b.name),
        SortBy::Date => a.date_key().cmp(&b.date_key()),
        SortBy::UploadTime => a.last_modified.cmp(&b.last_modified),
    };

    match sort.sort_order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Indices of `documents` in sorted order.
pub fn document_order(documents: &[DocumentMeta], sort: &SortConfig) -> Vec<usize> {
    let mut order: Vec<usize> = (0..documents.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| compare_documents(&documents[a], &documents[b], sort));
    order
}

/// Concatenate each document's pages following `order`, keeping every
/// document's internal page order.
pub fn flatten_pages<T: Clone>(order: &[usize], pages_per_document: &[Vec<T>]) -> Vec<T> {
    order
        .iter()
        .filter_map(|&index| pages_per_document.get(index))
        .flat_map(|pages| pages.iter().cloned())
        .collect()
}

/// Split the flattened page list into one chunk per sheet.
pub fn chunk_pages<T>(pages: &[T], layout_type: LayoutType) -> std::slice::Chunks<'_, T> {
    pages.chunks(layout_type.cells_per_sheet())
}

// =============================================================================
// Grouping
// =============================================================================

/// Pages in sheet order together with the sheet capacity
#[derive(Debug, Clone, PartialEq)]
pub struct PageGroups {
    /// Every source page, flattened in sorted document order
    pub pages: Vec<SourcePage>,
    /// Pages per sheet
    pub chunk_size: usize,
}

impl PageGroups {
    pub fn chunks(&self) -> std::slice::Chunks<'_, SourcePage> {
        self.pages.chunks(self.chunk_size)
    }

    pub fn sheet_count(&self) -> usize {
        self.pages.len().div_ceil(self.chunk_size)
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Order documents by `sort` and chunk their pages for `layout_type`.
///
/// `pages_per_document[i]` belongs to `documents[i]`.
pub fn group_pages(
    documents: &[DocumentMeta],
    pages_per_document: &[Vec<SourcePage>],
    sort: &SortConfig,
    layout_type: LayoutType,
) -> PageGroups {
    let order = document_order(documents, sort);
    PageGroups {
        pages: flatten_pages(&order, pages_per_document),
        chunk_size: layout_type.cells_per_sheet(),
    }
}
