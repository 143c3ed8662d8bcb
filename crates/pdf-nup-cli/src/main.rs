mod logger;

use anyhow::{Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use logger::CliLogger;
use pdf_nup::{DividerKind, LayoutType, Orientation, SortBy, SortOrder, default_output_name};
use pdf_nup_runtime::{
    ComposeOptions, JobStatus, NupCommand, NupUpdate, ProcessingJob, WorkerHandle, spawn_worker,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdfnup", about = "Place several PDF pages on each output sheet", version)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose input PDFs into one N-up PDF
    Compose {
        /// Input PDF file(s) - can specify multiple
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output PDF file (defaults to merged_<timestamp>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,

        /// Write the effective options to a JSON file
        #[arg(long)]
        save_config: Option<PathBuf>,

        /// Retry a failed job this many times
        #[arg(long, default_value = "0")]
        retries: u32,
    },

    /// Write only the first few sheets
    Preview {
        /// Input PDF file(s) - can specify multiple
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        options: OptionArgs,

        /// Number of sheets to render
        #[arg(long, default_value = "2")]
        sheets: usize,
    },

    /// Show how many sheets a layout would produce
    Stats {
        /// Input PDF file(s) - can specify multiple
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },
}

/// Layout and sort flags; each one overrides the config file when given
#[derive(Args)]
struct OptionArgs {
    /// Load options from a JSON file first
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid of pages per sheet
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Output orientation
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Margin around the grid in points
    #[arg(long)]
    margin: Option<f32>,

    /// Page scale inside each cell, in (0, 1]
    #[arg(long)]
    scale: Option<f32>,

    /// Divider lines between cells
    #[arg(long, value_enum)]
    divider: Option<DividerArg>,

    /// Divider color as #rrggbb
    #[arg(long)]
    divider_color: Option<String>,

    /// Divider stroke width in points
    #[arg(long)]
    divider_thickness: Option<f32>,

    /// Document sort key
    #[arg(long, value_enum)]
    sort_by: Option<SortByArg>,

    /// Document sort order
    #[arg(long, value_enum)]
    sort_order: Option<SortOrderArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    #[value(name = "1x1")]
    OneByOne,
    #[value(name = "2x1")]
    TwoByOne,
    #[value(name = "1x2")]
    OneByTwo,
    #[value(name = "2x2")]
    TwoByTwo,
    #[value(name = "3x3")]
    ThreeByThree,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum DividerArg {
    None,
    Cross,
    Grid,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortByArg {
    Date,
    Name,
    UploadTime,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortOrderArg {
    Asc,
    Desc,
}

impl From<LayoutArg> for LayoutType {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::OneByOne => Self::OneByOne,
            LayoutArg::TwoByOne => Self::TwoByOne,
            LayoutArg::OneByTwo => Self::OneByTwo,
            LayoutArg::TwoByTwo => Self::TwoByTwo,
            LayoutArg::ThreeByThree => Self::ThreeByThree,
        }
    }
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<DividerArg> for DividerKind {
    fn from(arg: DividerArg) -> Self {
        match arg {
            DividerArg::None => Self::None,
            DividerArg::Cross => Self::Cross,
            DividerArg::Grid => Self::Grid,
        }
    }
}

impl From<SortByArg> for SortBy {
    fn from(arg: SortByArg) -> Self {
        match arg {
            SortByArg::Date => Self::Date,
            SortByArg::Name => Self::Name,
            SortByArg::UploadTime => Self::UploadTime,
        }
    }
}

impl From<SortOrderArg> for SortOrder {
    fn from(arg: SortOrderArg) -> Self {
        match arg {
            SortOrderArg::Asc => Self::Asc,
            SortOrderArg::Desc => Self::Desc,
        }
    }
}

impl OptionArgs {
    /// Apply the explicit flags on top of `base`
    fn apply(&self, mut base: ComposeOptions) -> ComposeOptions {
        let layout = &mut base.layout;
        if let Some(layout_type) = self.layout {
            layout.layout_type = layout_type.into();
        }
        if let Some(orientation) = self.orientation {
            layout.orientation = orientation.into();
        }
        if let Some(margin) = self.margin {
            layout.margin = margin;
        }
        if let Some(scale) = self.scale {
            layout.scale = scale;
        }
        if let Some(divider) = self.divider {
            layout.divider_style.kind = divider.into();
        }
        if let Some(color) = &self.divider_color {
            layout.divider_style.color = color.clone();
        }
        if let Some(thickness) = self.divider_thickness {
            layout.divider_style.thickness = thickness;
        }
        if let Some(sort_by) = self.sort_by {
            base.sort.sort_by = sort_by.into();
        }
        if let Some(sort_order) = self.sort_order {
            base.sort.sort_order = sort_order.into();
        }
        base.layout = base.layout.normalized();
        base
    }
}

/// Wait for the next update that is not job progress
async fn next_result(worker: &mut WorkerHandle) -> Result<NupUpdate> {
    loop {
        match worker.updates.recv().await {
            Some(NupUpdate::Error { message }) => bail!(message),
            Some(NupUpdate::Progress(_)) => {}
            Some(update) => return Ok(update),
            None => bail!("Worker stopped unexpectedly"),
        }
    }
}

async fn resolve_options(worker: &mut WorkerHandle, args: &OptionArgs) -> Result<ComposeOptions> {
    let base = match &args.config {
        Some(path) => {
            worker
                .commands
                .send(NupCommand::LoadConfig { path: path.clone() })?;
            match next_result(worker).await? {
                NupUpdate::ConfigLoaded { options } => options,
                other => bail!("Unexpected worker response: {:?}", other),
            }
        }
        None => ComposeOptions::default(),
    };
    Ok(args.apply(base))
}

/// Drive a compose job to a terminal state, retrying and honoring Ctrl-C
async fn run_compose(worker: &mut WorkerHandle, retries: u32, quiet: bool) -> Result<ProcessingJob> {
    let mut cancelled = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            update = worker.updates.recv() => match update {
                Some(NupUpdate::Progress(progress)) => {
                    if !quiet {
                        match &progress.detail {
                            Some(detail) => {
                                eprintln!("[{:>3}%] {} ({})", progress.percent, progress.stage, detail)
                            }
                            None => eprintln!("[{:>3}%] {}", progress.percent, progress.stage),
                        }
                    }
                }
                Some(NupUpdate::JobChanged(job)) if job.is_terminal() => {
                    let attempts_left = job.attempts <= retries;
                    if !(job.can_retry() && attempts_left && !cancelled) {
                        return Ok(job);
                    }
                    log::warn!(
                        "Attempt {} failed: {}",
                        job.attempts,
                        job.failure_reason.as_deref().unwrap_or("unknown error")
                    );
                    worker.commands.send(NupCommand::Retry)?;
                }
                Some(NupUpdate::JobChanged(job)) => {
                    log::debug!("Job {} is {:?}", job.id, job.status);
                }
                Some(NupUpdate::Error { message }) => bail!(message),
                Some(other) => log::debug!("Ignoring worker update {:?}", other),
                None => bail!("Worker stopped unexpectedly"),
            },
            _ = &mut ctrl_c, if !cancelled => {
                log::warn!("Interrupted, cancelling job");
                cancelled = true;
                worker.cancel.cancel();
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    CliLogger::new(CliLogger::level_for(cli.verbose, cli.quiet)).init()?;

    let mut worker = spawn_worker();

    match cli.command {
        Commands::Compose {
            input,
            output,
            options,
            save_config,
            retries,
        } => {
            let options = resolve_options(&mut worker, &options).await?;

            if let Some(path) = save_config {
                worker.commands.send(NupCommand::SaveConfig {
                    path,
                    options: options.clone(),
                })?;
                if let NupUpdate::ConfigSaved { path } = next_result(&mut worker).await? {
                    log::info!("Saved options to {}", path.display());
                }
            }

            let output_path = output.unwrap_or_else(|| PathBuf::from(default_output_name()));
            worker.commands.send(NupCommand::Compose {
                inputs: input,
                options,
                output_path,
            })?;

            let job = run_compose(&mut worker, retries, cli.quiet).await?;
            if job.status != JobStatus::Completed {
                return Err(anyhow!(
                    "Job {} failed after {} attempt(s): {}",
                    job.id,
                    job.attempts,
                    job.failure_reason.unwrap_or_default()
                ));
            }

            let result = job
                .result
                .ok_or_else(|| anyhow!("Job {} completed without a result", job.id))?;
            for failure in result.report.failures() {
                log::warn!(
                    "Sheet {} cell {}: page {} of document {} replaced: {}",
                    failure.sheet + 1,
                    failure.cell + 1,
                    failure.page.page_number,
                    failure.page.document + 1,
                    failure.error
                );
            }
            println!(
                "Composed {} pages onto {} sheets ({} bytes) → {}",
                result.report.source_pages,
                result.report.sheet_count(),
                result.size_bytes,
                result
                    .output_path
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }

        Commands::Preview {
            input,
            output,
            options,
            sheets,
        } => {
            let options = resolve_options(&mut worker, &options).await?;
            worker.commands.send(NupCommand::GeneratePreview {
                inputs: input,
                options,
                max_sheets: sheets,
                output_path: output,
            })?;

            if let NupUpdate::PreviewGenerated { path, sheet_count } =
                next_result(&mut worker).await?
            {
                println!("Preview of {} sheet(s) → {}", sheet_count, path.display());
            }
        }

        Commands::Stats { input, options } => {
            let options = resolve_options(&mut worker, &options).await?;
            let layout = options.layout;
            worker.commands.send(NupCommand::CalculateStats {
                inputs: input,
                layout: layout.clone(),
            })?;

            if let NupUpdate::StatsCalculated { stats } = next_result(&mut worker).await? {
                println!("N-up Statistics ({}):", layout.layout_type);
                println!("  Source pages: {}", stats.source_pages);
                println!("  Cells per sheet: {}", stats.cells_per_sheet);
                println!("  Output sheets: {}", stats.output_sheets);
                println!("  Blank cells: {}", stats.blank_cells);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_options(args: &[&str]) -> ComposeOptions {
        let mut argv = vec!["pdfnup", "stats", "-i", "a.pdf"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Stats { options, .. } => options.apply(ComposeOptions::default()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        assert_eq!(parse_options(&[]), ComposeOptions::default());
    }

    #[test]
    fn test_flags_override_base() {
        let options = parse_options(&[
            "--layout",
            "3x3",
            "--orientation",
            "landscape",
            "--divider",
            "none",
            "--sort-by",
            "upload-time",
            "--sort-order",
            "asc",
        ]);
        assert_eq!(options.layout.layout_type, LayoutType::ThreeByThree);
        assert_eq!(options.layout.orientation, Orientation::Landscape);
        assert_eq!(options.layout.divider_style.kind, DividerKind::None);
        assert_eq!(options.sort.sort_by, SortBy::UploadTime);
        assert_eq!(options.sort.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let options = parse_options(&["--margin", "500", "--scale", "3"]);
        assert!(options.layout.margin <= 50.0);
        assert_eq!(options.layout.scale, 1.0);
    }

    #[tokio::test]
    async fn test_failed_job_is_retried_until_attempts_run_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = spawn_worker();
        worker
            .commands
            .send(NupCommand::Compose {
                inputs: vec![dir.path().join("missing.pdf")],
                options: ComposeOptions::default(),
                output_path: dir.path().join("out.pdf"),
            })
            .unwrap();

        let job = run_compose(&mut worker, 2, true).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 3);
    }
}
