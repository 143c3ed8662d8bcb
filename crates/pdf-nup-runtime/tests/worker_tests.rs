use lopdf::{Dictionary, Document, Object, Stream};
use pdf_nup_runtime::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

fn write_test_pdf(dir: &Path, name: &str, num_pages: usize) -> PathBuf {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

async fn next_update(handle: &mut WorkerHandle) -> NupUpdate {
    timeout(Duration::from_secs(10), handle.updates.recv())
        .await
        .expect("worker timed out")
        .expect("worker channel closed")
}

/// Collect updates until the job reaches a terminal state
async fn run_to_end(handle: &mut WorkerHandle) -> (Vec<ProgressUpdate>, ProcessingJob) {
    let mut progress = Vec::new();
    loop {
        match next_update(handle).await {
            NupUpdate::Progress(update) => progress.push(update),
            NupUpdate::JobChanged(job) if job.is_terminal() => return (progress, job),
            NupUpdate::JobChanged(_) => {}
            other => panic!("unexpected update {other:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_compose_job_completes() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_test_pdf(dir.path(), "a.pdf", 3),
        write_test_pdf(dir.path(), "b.pdf", 2),
    ];
    let output_path = dir.path().join("out.pdf");

    let mut handle = spawn_worker();
    handle
        .commands
        .send(NupCommand::Compose {
            inputs,
            options: ComposeOptions::default(),
            output_path: output_path.clone(),
        })
        .unwrap();

    let (progress, job) = run_to_end(&mut handle).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 1);
    let result = job.result.unwrap();
    assert_eq!(result.output_path.as_deref(), Some(output_path.as_path()));
    assert_eq!(result.report.sheet_count(), 2);

    assert_eq!(progress.first().map(|u| u.stage), Some(ProgressStage::Preparing));
    assert_eq!(progress.last().map(|u| u.stage), Some(ProgressStage::Completed));

    let written = Document::load(&output_path).unwrap();
    assert_eq!(written.get_pages().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_job_can_be_retried() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("later.pdf");
    let output_path = dir.path().join("out.pdf");

    let mut handle = spawn_worker();
    handle
        .commands
        .send(NupCommand::Compose {
            inputs: vec![missing.clone()],
            options: ComposeOptions::default(),
            output_path: output_path.clone(),
        })
        .unwrap();

    let (_, job) = run_to_end(&mut handle).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.failure_reason.is_some());
    assert!(job.result.is_none());
    assert!(!output_path.exists());

    // Provide the input, then retry the same job
    write_test_pdf(dir.path(), "later.pdf", 4);
    handle.commands.send(NupCommand::Retry).unwrap();

    let (_, retried) = run_to_end(&mut handle).await;
    assert_eq!(retried.id, job.id);
    assert_eq!(retried.attempts, 2);
    assert_eq!(retried.status, JobStatus::Completed);
    assert!(output_path.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retry_without_failed_job() {
    let mut handle = spawn_worker();
    handle.commands.send(NupCommand::Retry).unwrap();

    match next_update(&mut handle).await {
        NupUpdate::Error { message } => assert!(message.contains("No failed job")),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_job_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![write_test_pdf(dir.path(), "a.pdf", 8)];
    let output_path = dir.path().join("out.pdf");

    let mut handle = spawn_worker();
    // Requested before the job starts, so it stops at the first check
    handle.cancel.cancel();
    handle
        .commands
        .send(NupCommand::Compose {
            inputs,
            options: ComposeOptions::default(),
            output_path: output_path.clone(),
        })
        .unwrap();

    let (progress, job) = run_to_end(&mut handle).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.failure_reason.unwrap().contains("cancelled"));
    assert_eq!(progress.last().map(|u| u.stage), Some(ProgressStage::Failed));
    assert!(!output_path.exists());

    // The cancellation was consumed; a retry runs to completion
    handle.commands.send(NupCommand::Retry).unwrap();
    let (_, retried) = run_to_end(&mut handle).await;
    assert_eq!(retried.status, JobStatus::Completed);
    assert!(output_path.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_calculate_stats() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![write_test_pdf(dir.path(), "a.pdf", 10)];

    let mut handle = spawn_worker();
    handle
        .commands
        .send(NupCommand::CalculateStats {
            inputs,
            layout: LayoutConfig::default(),
        })
        .unwrap();

    match next_update(&mut handle).await {
        NupUpdate::StatsCalculated { stats } => {
            assert_eq!(stats.source_pages, 10);
            assert_eq!(stats.output_sheets, 3);
            assert_eq!(stats.blank_cells, 2);
        }
        other => panic!("expected StatsCalculated, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.json");

    let mut options = ComposeOptions::default();
    options.layout.margin = 33.0;

    let mut handle = spawn_worker();
    handle
        .commands
        .send(NupCommand::SaveConfig {
            path: path.clone(),
            options: options.clone(),
        })
        .unwrap();
    assert!(matches!(
        next_update(&mut handle).await,
        NupUpdate::ConfigSaved { .. }
    ));

    handle
        .commands
        .send(NupCommand::LoadConfig { path })
        .unwrap();
    match next_update(&mut handle).await {
        NupUpdate::ConfigLoaded { options: loaded } => assert_eq!(loaded, options),
        other => panic!("expected ConfigLoaded, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preview_requests_are_coalesced() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![write_test_pdf(dir.path(), "a.pdf", 20)];

    let mut handle = spawn_worker();
    for max_sheets in 1..=3 {
        handle
            .commands
            .send(NupCommand::GeneratePreview {
                inputs: inputs.clone(),
                options: ComposeOptions::default(),
                max_sheets,
                output_path: dir.path().join(format!("preview-{}.pdf", max_sheets)),
            })
            .unwrap();
    }

    // The first request may already be running; the last one always wins
    let mut last = None;
    while last != Some(3) {
        match next_update(&mut handle).await {
            NupUpdate::PreviewGenerated { sheet_count, .. } => last = Some(sheet_count),
            other => panic!("expected PreviewGenerated, got {other:?}"),
        }
    }
    assert!(dir.path().join("preview-3.pdf").exists());
}
