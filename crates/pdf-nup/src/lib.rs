pub mod compose;
pub mod constants;
pub mod group;
pub mod job;
pub mod layout;
mod options;
mod preview;
pub mod render;
mod stats;
mod types;

pub use compose::{
    CellOutcome, ComposeOutput, ComposeReport, InputDocument, PageFailure, SheetReport, compose,
    default_output_name, load_pdf, read_input, read_inputs, save_pdf,
};
pub use group::{DocumentMeta, SourcePage};
pub use job::{
    CancelFlag, JobContext, JobResult, JobStatus, ProcessingJob, ProgressStage, ProgressUpdate,
};
pub use options::*;
pub use preview::{PreviewGeometry, generate_preview, preview_geometry, preview_geometry_for};
pub use stats::{calculate_statistics, sheet_count, statistics_for_pages};
pub use types::*;
