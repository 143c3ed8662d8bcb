use crate::{NupCommand, NupUpdate};
use pdf_nup::{
    CancelFlag, ComposeOptions, JobContext, JobResult, LayoutConfig, ProcessingJob,
    calculate_statistics, compose, generate_preview, load_pdf, read_inputs, save_pdf,
};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Front-end side of a running worker
pub struct WorkerHandle {
    pub commands: mpsc::UnboundedSender<NupCommand>,
    pub updates: mpsc::UnboundedReceiver<NupUpdate>,
    /// Cancels the job currently running on the worker
    pub cancel: CancelFlag,
    pub task: JoinHandle<()>,
}

/// Spawn a worker on the current tokio runtime
pub fn spawn_worker() -> WorkerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let cancel = CancelFlag::new();

    let task = tokio::spawn(worker_task(command_rx, update_tx, cancel.clone()));

    WorkerHandle {
        commands: command_tx,
        updates: update_rx,
        cancel,
        task,
    }
}

/// Inputs of the most recent compose job, kept for retries
struct ComposeRequest {
    inputs: Vec<PathBuf>,
    options: ComposeOptions,
    output_path: PathBuf,
}

#[derive(Default)]
struct WorkerState {
    last_request: Option<ComposeRequest>,
    last_job: Option<ProcessingJob>,
}

/// Async worker task that processes commands and sends updates
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<NupCommand>,
    update_tx: mpsc::UnboundedSender<NupUpdate>,
    cancel: CancelFlag,
) {
    let mut state = WorkerState::default();

    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &mut state, &cancel, &mut command_rx, &update_tx).await;
    }

    log::debug!("Command channel closed, worker exiting");
}

async fn process_command(
    cmd: NupCommand,
    state: &mut WorkerState,
    cancel: &CancelFlag,
    command_rx: &mut mpsc::UnboundedReceiver<NupCommand>,
    update_tx: &mpsc::UnboundedSender<NupUpdate>,
) {
    match cmd {
        NupCommand::Compose {
            inputs,
            options,
            output_path,
        } => {
            let request = ComposeRequest {
                inputs,
                options,
                output_path,
            };
            let mut job = ProcessingJob::new();
            run_job(&mut job, &request, cancel, update_tx).await;
            state.last_request = Some(request);
            state.last_job = Some(job);
        }
        NupCommand::Retry => match (&state.last_request, state.last_job.as_mut()) {
            (Some(request), Some(job)) if job.can_retry() => {
                log::info!("Retrying job {} (attempt {})", job.id, job.attempts + 1);
                run_job(job, request, cancel, update_tx).await;
            }
            _ => {
                let _ = update_tx.send(NupUpdate::Error {
                    message: "No failed job to retry".to_string(),
                });
            }
        },
        NupCommand::GeneratePreview {
            mut inputs,
            mut options,
            mut max_sheets,
            mut output_path,
        } => {
            // Drain any queued preview commands, keeping only the most recent
            while let Ok(next_cmd) = command_rx.try_recv() {
                if let NupCommand::GeneratePreview {
                    inputs: new_inputs,
                    options: new_options,
                    max_sheets: new_max_sheets,
                    output_path: new_output_path,
                } = next_cmd
                {
                    log::debug!("Discarding queued preview generation, using newer request");
                    inputs = new_inputs;
                    options = new_options;
                    max_sheets = new_max_sheets;
                    output_path = new_output_path;
                } else {
                    // Non-preview command found; it cannot be put back, so run it first
                    Box::pin(process_command(
                        next_cmd, state, cancel, command_rx, update_tx,
                    ))
                    .await;
                }
            }

            handle_generate_preview(inputs, options, max_sheets, output_path, update_tx).await;
        }
        NupCommand::CalculateStats { inputs, layout } => {
            handle_calculate_stats(inputs, layout, update_tx).await;
        }
        NupCommand::LoadConfig { path } => match ComposeOptions::load(&path).await {
            Ok(options) => {
                log::info!("Loaded configuration from {}", path.display());
                let _ = update_tx.send(NupUpdate::ConfigLoaded { options });
            }
            Err(e) => {
                let _ = update_tx.send(NupUpdate::Error {
                    message: format!("Failed to load config: {}", e),
                });
            }
        },
        NupCommand::SaveConfig { path, options } => match options.save(&path).await {
            Ok(()) => {
                let _ = update_tx.send(NupUpdate::ConfigSaved { path });
            }
            Err(e) => {
                let _ = update_tx.send(NupUpdate::Error {
                    message: format!("Failed to save config: {}", e),
                });
            }
        },
    }
}

/// Run one attempt of a compose job, reporting the job record before and after
async fn run_job(
    job: &mut ProcessingJob,
    request: &ComposeRequest,
    cancel: &CancelFlag,
    update_tx: &mpsc::UnboundedSender<NupUpdate>,
) {
    job.start();
    let _ = update_tx.send(NupUpdate::JobChanged(job.clone()));

    let progress_tx = update_tx.clone();
    let ctx = JobContext::new()
        .with_cancel_flag(cancel.clone())
        .with_reporter(move |update| {
            let _ = progress_tx.send(NupUpdate::Progress(update.clone()));
        });

    let result = async {
        let inputs = read_inputs(&request.inputs).await?;
        let output = compose(&inputs, &request.options, &ctx).await?;
        output.save(&request.output_path).await?;
        Ok::<_, pdf_nup::ComposeError>(output)
    }
    .await;

    match result {
        Ok(output) => {
            let failures = output.report.failures().len();
            if failures > 0 {
                log::warn!("Job {} completed with {} page(s) replaced", job.id, failures);
            }
            job.complete(JobResult {
                output_path: Some(request.output_path.clone()),
                size_bytes: output.bytes.len(),
                report: output.report,
            });
        }
        Err(e) => {
            log::error!("Job {} failed: {}", job.id, e);
            job.fail(e.to_string());
        }
    }

    // A cancellation only ever applies to the job it interrupted
    cancel.reset();
    let _ = update_tx.send(NupUpdate::JobChanged(job.clone()));
}

async fn handle_generate_preview(
    inputs: Vec<PathBuf>,
    options: ComposeOptions,
    max_sheets: usize,
    output_path: PathBuf,
    update_tx: &mpsc::UnboundedSender<NupUpdate>,
) {
    let result = async {
        let inputs = read_inputs(&inputs).await?;
        let preview = generate_preview(&inputs, &options, max_sheets).await?;
        let sheet_count = preview.get_pages().len();
        save_pdf(preview, &output_path).await?;
        Ok::<_, pdf_nup::ComposeError>(sheet_count)
    }
    .await;

    match result {
        Ok(sheet_count) => {
            let _ = update_tx.send(NupUpdate::PreviewGenerated {
                path: output_path,
                sheet_count,
            });
        }
        Err(e) => {
            let _ = update_tx.send(NupUpdate::Error {
                message: format!("Failed to generate preview: {}", e),
            });
        }
    }
}

async fn handle_calculate_stats(
    inputs: Vec<PathBuf>,
    layout: LayoutConfig,
    update_tx: &mpsc::UnboundedSender<NupUpdate>,
) {
    let mut documents = Vec::with_capacity(inputs.len());
    for path in &inputs {
        match load_pdf(path).await {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                let _ = update_tx.send(NupUpdate::Error {
                    message: format!("Failed to load PDFs: {}", e),
                });
                return;
            }
        }
    }

    match calculate_statistics(&documents, &layout) {
        Ok(stats) => {
            let _ = update_tx.send(NupUpdate::StatsCalculated { stats });
        }
        Err(e) => {
            let _ = update_tx.send(NupUpdate::Error {
                message: format!("Failed to calculate statistics: {}", e),
            });
        }
    }
}
