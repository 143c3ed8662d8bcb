use std::path::PathBuf;

mod worker;

pub use worker::{WorkerHandle, spawn_worker, worker_task};

// Re-export types from the library crate
pub use pdf_nup::{
    CancelFlag, ComposeOptions, ComposeReport, JobResult, JobStatus, LayoutConfig, NupStatistics,
    ProcessingJob, ProgressStage, ProgressUpdate,
};

/// Commands sent from the front end to the worker
#[derive(Debug)]
pub enum NupCommand {
    /// Start a new compositing job
    Compose {
        inputs: Vec<PathBuf>,
        options: ComposeOptions,
        output_path: PathBuf,
    },
    /// Re-run the last failed job from the same inputs
    Retry,
    /// Write the first `max_sheets` sheets to `output_path`
    GeneratePreview {
        inputs: Vec<PathBuf>,
        options: ComposeOptions,
        max_sheets: usize,
        output_path: PathBuf,
    },
    CalculateStats {
        inputs: Vec<PathBuf>,
        layout: LayoutConfig,
    },
    LoadConfig {
        path: PathBuf,
    },
    SaveConfig {
        path: PathBuf,
        options: ComposeOptions,
    },
}

/// Updates sent from the worker to the front end
#[derive(Debug, Clone)]
pub enum NupUpdate {
    /// Stage progress of the running job
    Progress(ProgressUpdate),
    /// The job record changed state (started, completed or failed)
    JobChanged(ProcessingJob),
    PreviewGenerated {
        path: PathBuf,
        sheet_count: usize,
    },
    StatsCalculated {
        stats: NupStatistics,
    },
    ConfigLoaded {
        options: ComposeOptions,
    },
    ConfigSaved {
        path: PathBuf,
    },
    Error {
        message: String,
    },
}
