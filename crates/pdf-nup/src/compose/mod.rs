//! N-up compositing - placing many source pages on each output sheet
//!
//! This module orchestrates the compositing process:
//! 1. Validate options and inputs, enforce the size ceiling
//! 2. Parse source documents and order their pages
//! 3. Draw each chunk of pages, then its dividers, onto a sheet
//! 4. Write the page tree and serialize the output
//!
//! Progress is reported at each stage through the [`JobContext`], which is
//! also checked for cancellation between stages and between sheets.

mod io;
mod sheet;

pub use io::{InputDocument, load_pdf, read_input, read_inputs, save_pdf};
pub use sheet::{CellOutcome, ComposeReport, PageFailure, SheetReport};

use crate::group::{DocumentMeta, SourcePage, group_pages};
use crate::job::{JobContext, ProgressStage, ProgressUpdate};
use crate::options::ComposeOptions;
use crate::types::*;
use chrono::Local;
use io::{SourceDocument, check_size, parse_document, serialize};
use lopdf::Document;
use sheet::Compositor;
use std::path::Path;

/// A finished composite: the serialized document plus what went into it
#[derive(Debug, Clone)]
pub struct ComposeOutput {
    pub bytes: Vec<u8>,
    pub report: ComposeReport,
}

impl ComposeOutput {
    /// Write the document to disk
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, &self.bytes).await?;
        Ok(())
    }
}

/// Default file name for a composite written now
pub fn default_output_name() -> String {
    format!("merged_{}.pdf", Local::now().timestamp_millis())
}

/// Main compositing function.
///
/// Emits `preparing`, `analyzing`, `reading_files`, `applying_layout`,
/// `adding_dividers` and `generating`, then `completed` on success or
/// `failed` on any error (cancellation included). A failed or cancelled run
/// produces no output.
pub async fn compose(
    inputs: &[InputDocument],
    options: &ComposeOptions,
    ctx: &JobContext,
) -> Result<ComposeOutput> {
    match compose_inner(inputs, options, ctx).await {
        Ok(output) => {
            log::info!(
                "Composed {} pages onto {} sheets ({} bytes)",
                output.report.source_pages,
                output.report.sheet_count(),
                output.bytes.len()
            );
            ctx.stage(ProgressStage::Completed);
            Ok(output)
        }
        Err(err) => {
            log::error!("Compositing failed: {}", err);
            ctx.stage(ProgressStage::Failed);
            Err(err)
        }
    }
}

async fn compose_inner(
    inputs: &[InputDocument],
    options: &ComposeOptions,
    ctx: &JobContext,
) -> Result<ComposeOutput> {
    let (mut document, report) = composite(inputs, options, ctx, None).await?;

    ctx.ensure_active()?;
    ctx.stage(ProgressStage::Generating);
    let bytes = tokio::task::spawn_blocking(move || serialize(&mut document)).await??;
    ctx.ensure_active()?;

    Ok(ComposeOutput { bytes, report })
}

/// Run every stage up to and including `adding_dividers`.
///
/// `max_sheets` stops after that many sheets (previews).
pub(crate) async fn composite(
    inputs: &[InputDocument],
    options: &ComposeOptions,
    ctx: &JobContext,
    max_sheets: Option<usize>,
) -> Result<(Document, ComposeReport)> {
    ctx.stage(ProgressStage::Preparing);
    options.validate()?;
    if inputs.is_empty() {
        return Err(InputError::NoDocuments.into());
    }
    ctx.ensure_active()?;

    ctx.stage(ProgressStage::Analyzing);
    for input in inputs {
        check_size(&input.meta.name, input.bytes.len() as u64)?;
    }
    ctx.ensure_active()?;

    let inputs = inputs.to_vec();
    let options = options.clone();
    let ctx = ctx.clone();

    tokio::task::spawn_blocking(move || composite_sync(&inputs, &options, &ctx, max_sheets))
        .await?
}

fn composite_sync(
    inputs: &[InputDocument],
    options: &ComposeOptions,
    ctx: &JobContext,
    max_sheets: Option<usize>,
) -> Result<(Document, ComposeReport)> {
    ctx.stage(ProgressStage::ReadingFiles);
    let (metas, sources) = read_sources(inputs, ctx)?;

    let pages_per_document: Vec<Vec<SourcePage>> =
        sources.iter().map(|source| source.pages.clone()).collect();
    let groups = group_pages(
        &metas,
        &pages_per_document,
        &options.sort,
        options.layout.layout_type,
    );
    if groups.is_empty() {
        return Err(InputError::NoPages.into());
    }

    let sheet_total = match max_sheets {
        Some(limit) => groups.sheet_count().min(limit),
        None => groups.sheet_count(),
    };
    log::info!(
        "{} pages from {} documents -> {} sheets ({}, {:?})",
        groups.pages.len(),
        inputs.len(),
        sheet_total,
        options.layout.layout_type,
        options.layout.orientation
    );
    ctx.ensure_active()?;

    ctx.stage(ProgressStage::ApplyingLayout);
    let mut compositor = Compositor::new(&sources, &options.layout);
    let mut sheets = Vec::with_capacity(sheet_total);
    for (sheet_index, chunk) in groups.chunks().take(sheet_total).enumerate() {
        ctx.ensure_active()?;
        sheets.push(compositor.add_sheet(sheet_index, chunk, sheet_index * groups.chunk_size));
        ctx.report(ProgressUpdate::within(
            ProgressStage::ApplyingLayout,
            sheet_index + 1,
            sheet_total,
        ));
    }

    // Every sheet already carries its dividers; what is left is the page tree
    ctx.ensure_active()?;
    ctx.stage(ProgressStage::AddingDividers);

    let report = ComposeReport {
        source_pages: groups.pages.len(),
        sheets,
    };
    Ok((compositor.into_document(), report))
}

/// Parse every input, keeping the caller's sort metadata as given
fn read_sources(
    inputs: &[InputDocument],
    ctx: &JobContext,
) -> Result<(Vec<DocumentMeta>, Vec<SourceDocument>)> {
    let mut metas = Vec::with_capacity(inputs.len());
    let mut sources = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        ctx.ensure_active()?;
        let source = parse_document(index, input)?;
        log::debug!("'{}': {} pages", input.meta.name, source.pages.len());

        metas.push(input.meta.clone());
        sources.push(source);
    }

    Ok((metas, sources))
}
