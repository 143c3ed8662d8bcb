//! Job progress, cancellation and lifecycle
//!
//! The compositing pipeline reports a fixed sequence of stages through a
//! [`JobContext`] and checks its [`CancelFlag`] between stages and sheets.
//! [`ProcessingJob`] is the caller-side record built from those reports.

use crate::compose::ComposeReport;
use crate::constants::*;
use crate::types::{ComposeError, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// Stages
// =============================================================================

/// Pipeline stage identifiers, in the order they are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ProgressStage {
    Preparing,
    Analyzing,
    ReadingFiles,
    ApplyingLayout,
    AddingDividers,
    Generating,
    Completed,
    Failed,
}

impl ProgressStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStage::Preparing => "preparing",
            ProgressStage::Analyzing => "analyzing",
            ProgressStage::ReadingFiles => "reading_files",
            ProgressStage::ApplyingLayout => "applying_layout",
            ProgressStage::AddingDividers => "adding_dividers",
            ProgressStage::Generating => "generating",
            ProgressStage::Completed => "completed",
            ProgressStage::Failed => "failed",
        }
    }

    /// Progress percentage at the start of this stage
    pub fn percent(self) -> u8 {
        match self {
            ProgressStage::Preparing => PROGRESS_PREPARING,
            ProgressStage::Analyzing => PROGRESS_ANALYZING,
            ProgressStage::ReadingFiles => PROGRESS_READING_FILES,
            ProgressStage::ApplyingLayout => PROGRESS_APPLYING_LAYOUT,
            ProgressStage::AddingDividers => PROGRESS_ADDING_DIVIDERS,
            ProgressStage::Generating => PROGRESS_GENERATING,
            ProgressStage::Completed => PROGRESS_COMPLETED,
            ProgressStage::Failed => 0,
        }
    }

    /// Percentage where the following stage begins
    fn end_percent(self) -> u8 {
        match self {
            ProgressStage::Preparing => PROGRESS_ANALYZING,
            ProgressStage::Analyzing => PROGRESS_READING_FILES,
            ProgressStage::ReadingFiles => PROGRESS_APPLYING_LAYOUT,
            ProgressStage::ApplyingLayout => PROGRESS_ADDING_DIVIDERS,
            ProgressStage::AddingDividers => PROGRESS_GENERATING,
            ProgressStage::Generating => PROGRESS_COMPLETED,
            ProgressStage::Completed => PROGRESS_COMPLETED,
            ProgressStage::Failed => 0,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressStage::Completed | ProgressStage::Failed)
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress report from the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub stage: ProgressStage,
    pub percent: u8,
    pub detail: Option<String>,
}

impl ProgressUpdate {
    /// Report entering `stage`
    pub fn stage(stage: ProgressStage) -> Self {
        Self {
            stage,
            percent: stage.percent(),
            detail: None,
        }
    }

    /// Report `done` of `total` units finished within `stage`
    pub fn within(stage: ProgressStage, done: usize, total: usize) -> Self {
        let start = u32::from(stage.percent());
        let span = u32::from(stage.end_percent()).saturating_sub(start);
        let fraction = if total == 0 {
            0
        } else {
            (span * done.min(total) as u32) / total as u32
        };
        Self {
            stage,
            percent: (start + fraction) as u8,
            detail: Some(format!("{}/{}", done, total)),
        }
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Shared flag for cooperative cancellation
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running job to stop at its next check
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Context
// =============================================================================

type Reporter = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Progress sink and cancellation flag handed to the pipeline
#[derive(Clone, Default)]
pub struct JobContext {
    reporter: Option<Reporter>,
    cancel: CancelFlag,
}

impl JobContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing cancellation flag with the caller
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Receive every progress update
    pub fn with_reporter(
        mut self,
        reporter: impl Fn(&ProgressUpdate) + Send + Sync + 'static,
    ) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    pub(crate) fn report(&self, update: ProgressUpdate) {
        log::debug!(
            "[{}%] {}{}",
            update.percent,
            update.stage,
            update
                .detail
                .as_deref()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default()
        );
        if let Some(reporter) = &self.reporter {
            reporter(&update);
        }
    }

    pub(crate) fn stage(&self, stage: ProgressStage) {
        self.report(ProgressUpdate::stage(stage));
    }

    /// Fail with [`ComposeError::Cancelled`] if cancellation was requested
    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            log::info!("Cancellation requested, stopping");
            Err(ComposeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("reporter", &self.reporter.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

// =============================================================================
// Job Record
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// What a completed job produced
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    /// Where the output was written, if it was written to disk
    pub output_path: Option<PathBuf>,
    /// Size of the serialized document
    pub size_bytes: usize,
    pub report: ComposeReport,
}

/// Caller-side view of one compositing job
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub current_stage: Option<ProgressStage>,
    pub failure_reason: Option<String>,
    pub result: Option<JobResult>,
    /// Number of times the pipeline has been started for this job
    pub attempts: u32,
    pub created_at: DateTime<Local>,
    pub completed_at: Option<DateTime<Local>>,
}

impl Default for ProcessingJob {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingJob {
    pub fn new() -> Self {
        let now = Local::now();
        Self {
            id: format!("job_{}", now.timestamp_millis()),
            status: JobStatus::Pending,
            progress: 0,
            current_stage: None,
            failure_reason: None,
            result: None,
            attempts: 0,
            created_at: now,
            completed_at: None,
        }
    }

    /// Mark the pipeline as (re)started
    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.progress = 0;
        self.current_stage = Some(ProgressStage::Preparing);
        self.failure_reason = None;
        self.result = None;
        self.completed_at = None;
        self.attempts += 1;
    }

    /// Fold a progress update into the record
    pub fn apply(&mut self, update: &ProgressUpdate) {
        if self.is_terminal() {
            return;
        }
        self.current_stage = Some(update.stage);
        self.progress = update.percent;
        match update.stage {
            ProgressStage::Completed => self.status = JobStatus::Completed,
            ProgressStage::Failed => self.status = JobStatus::Failed,
            _ => self.status = JobStatus::Processing,
        }
    }

    pub fn complete(&mut self, result: JobResult) {
        self.status = JobStatus::Completed;
        self.progress = PROGRESS_COMPLETED;
        self.current_stage = Some(ProgressStage::Completed);
        self.result = Some(result);
        self.completed_at = Some(Local::now());
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.progress = 0;
        self.current_stage = Some(ProgressStage::Failed);
        self.failure_reason = Some(reason.into());
        self.result = None;
        self.completed_at = Some(Local::now());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    /// Failed jobs can be re-run from the same inputs
    pub fn can_retry(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_identifiers() {
        let stages = [
            ProgressStage::Preparing,
            ProgressStage::Analyzing,
            ProgressStage::ReadingFiles,
            ProgressStage::ApplyingLayout,
            ProgressStage::AddingDividers,
            ProgressStage::Generating,
            ProgressStage::Completed,
            ProgressStage::Failed,
        ];
        let names: Vec<&str> = stages.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "preparing",
                "analyzing",
                "reading_files",
                "applying_layout",
                "adding_dividers",
                "generating",
                "completed",
                "failed"
            ]
        );
    }

    #[test]
    fn test_within_stage_progress() {
        let start = ProgressUpdate::within(ProgressStage::ApplyingLayout, 0, 4);
        assert_eq!(start.percent, 60);
        let half = ProgressUpdate::within(ProgressStage::ApplyingLayout, 2, 4);
        assert_eq!(half.percent, 70);
        let done = ProgressUpdate::within(ProgressStage::ApplyingLayout, 4, 4);
        assert_eq!(done.percent, 80);
        let empty = ProgressUpdate::within(ProgressStage::AddingDividers, 0, 0);
        assert_eq!(empty.percent, 80);
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let ctx = JobContext::new().with_cancel_flag(flag.clone());
        assert!(ctx.ensure_active().is_ok());

        flag.cancel();
        assert!(matches!(ctx.ensure_active(), Err(ComposeError::Cancelled)));

        flag.reset();
        assert!(ctx.ensure_active().is_ok());
    }

    #[test]
    fn test_job_lifecycle_and_retry() {
        let mut job = ProcessingJob::new();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.id.starts_with("job_"));

        job.start();
        job.apply(&ProgressUpdate::stage(ProgressStage::ReadingFiles));
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 40);

        job.fail("Document 'a.pdf' could not be read");
        assert!(job.can_retry());
        assert!(job.result.is_none());

        // Late updates do not revive a terminal job
        job.apply(&ProgressUpdate::stage(ProgressStage::Generating));
        assert_eq!(job.status, JobStatus::Failed);

        job.start();
        assert_eq!(job.attempts, 2);
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.failure_reason.is_none());

        job.complete(JobResult {
            output_path: None,
            size_bytes: 1024,
            report: ComposeReport::default(),
        });
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(!job.can_retry());
        assert!(job.completed_at.is_some());
    }
}
