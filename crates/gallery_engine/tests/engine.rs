use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gallery_core::FilterKind;
use gallery_engine::{
    EngineCommand, EngineConfig, EngineEvent, EngineHandle, FailureKind, FetchError,
    FetchMetadata, FetchOutput, Fetcher, IdleStrategy, NullProbe, SchedulerSettings,
};
use image::{ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Serves a small PNG for `mem://ok/...` and a 404 for anything else.
struct MemoryFetcher;

#[async_trait::async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        if !url.starts_with("mem://ok/") {
            return Err(FetchError {
                kind: FailureKind::HttpStatus(404),
                message: "not found".to_string(),
            });
        }
        let mut buf = Cursor::new(Vec::new());
        RgbImage::from_pixel(8, 6, Rgb([200, 100, 50]))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        let bytes = buf.into_inner();
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                redirect_count: 0,
                content_type: Some("image/png".to_string()),
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

fn start_engine(output: &TempDir) -> EngineHandle {
    let config = EngineConfig {
        scheduler: SchedulerSettings {
            idle_timeout: Duration::from_millis(200),
        },
        idle: IdleStrategy::Fallback(Duration::from_millis(5)),
        batch_delay: Duration::from_millis(5),
        output_dir: output.path().to_path_buf(),
        rng_seed: Some(42),
        clock: Arc::new(|| "2026-10-19T08:00:00Z".to_string()),
        ..EngineConfig::default()
    };
    EngineHandle::with_fetcher(config, Arc::new(MemoryFetcher), Arc::new(NullProbe), None)
        .unwrap()
}

fn wait_for(engine: &EngineHandle, mut matches: impl FnMut(&EngineEvent) -> bool) -> EngineEvent {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(50)) {
            if matches(&event) {
                return event;
            }
        }
    }
    panic!("expected engine event did not arrive");
}

#[test]
fn reports_connection_and_scheduler_on_start() {
    let output = TempDir::new().unwrap();
    let engine = start_engine(&output);

    let connection = wait_for(&engine, |event| {
        matches!(event, EngineEvent::ConnectionChanged(_))
    });
    let EngineEvent::ConnectionChanged(snapshot) = connection else {
        unreachable!()
    };
    assert!(snapshot.online);

    wait_for(&engine, |event| {
        matches!(event, EngineEvent::SchedulerChanged(status) if status.idle)
    });
    engine.shutdown();
}

#[test]
fn fetch_more_generates_consecutive_batch() {
    let output = TempDir::new().unwrap();
    let engine = start_engine(&output);

    engine.send(EngineCommand::FetchMore {
        start_id: 17,
        count: 8,
        delay: Duration::from_millis(20),
    });
    let EngineEvent::BatchReady { images } =
        wait_for(&engine, |event| matches!(event, EngineEvent::BatchReady { .. }))
    else {
        unreachable!()
    };
    let ids: Vec<_> = images.iter().map(|image| image.id).collect();
    assert_eq!(ids, (17..25).collect::<Vec<_>>());
    engine.shutdown();
}

#[test]
fn load_filter_process_and_export_an_image() {
    let output = TempDir::new().unwrap();
    let engine = start_engine(&output);

    engine.send(EngineCommand::LoadImage {
        image_id: 1,
        url: "mem://ok/1".to_string(),
    });
    let loaded = wait_for(&engine, |event| matches!(event, EngineEvent::ImageLoaded { .. }));
    assert_eq!(
        loaded,
        EngineEvent::ImageLoaded {
            image_id: 1,
            width: 8,
            height: 6
        }
    );

    engine.send(EngineCommand::ApplyFilter {
        image_id: 1,
        filter: FilterKind::Grayscale,
    });
    let filtered = wait_for(&engine, |event| {
        matches!(event, EngineEvent::FilterApplied { .. })
    });
    assert_eq!(
        filtered,
        EngineEvent::FilterApplied {
            image_id: 1,
            filter: FilterKind::Grayscale,
            width: 8,
            height: 6
        }
    );

    engine.send(EngineCommand::ProcessImage {
        task_id: "process-image-1".to_string(),
        priority: 1,
        image_id: 1,
        filter: FilterKind::Grayscale,
    });
    wait_for(&engine, |event| {
        *event
            == EngineEvent::ImageProcessed {
                image_id: 1,
                preview_width: 8,
                preview_height: 6,
            }
    });

    engine.send(EngineCommand::Export {
        image_id: 1,
        title: "Photo 1".to_string(),
        source_url: "mem://ok/1".to_string(),
        filter: FilterKind::Grayscale,
    });
    let EngineEvent::Exported { image_id, path } =
        wait_for(&engine, |event| matches!(event, EngineEvent::Exported { .. }))
    else {
        unreachable!()
    };
    assert_eq!(image_id, 1);
    assert!(path.starts_with(output.path()));
    assert!(path.exists());
    assert!(path.with_extension("json").exists());
    engine.shutdown();
}

#[test]
fn failures_stay_isolated() {
    let output = TempDir::new().unwrap();
    let engine = start_engine(&output);

    engine.send(EngineCommand::LoadImage {
        image_id: 2,
        url: "mem://missing/2".to_string(),
    });
    let failed = wait_for(&engine, |event| matches!(event, EngineEvent::ImageFailed { .. }));
    assert_eq!(
        failed,
        EngineEvent::ImageFailed {
            image_id: 2,
            failure: FailureKind::HttpStatus(404)
        }
    );

    // Processing an image that never loaded fails the task; the queue moves on.
    engine.send(EngineCommand::ProcessImage {
        task_id: "process-image-2".to_string(),
        priority: 1,
        image_id: 2,
        filter: FilterKind::None,
    });
    engine.send(EngineCommand::ProcessBatch {
        task_id: "process-batch-1".to_string(),
        priority: 1,
        start_id: 1,
        count: 16,
    });
    wait_for(&engine, |event| {
        matches!(event, EngineEvent::SchedulerChanged(status)
            if status.failed == 1 && status.completed == 1 && status.idle)
    });

    engine.send(EngineCommand::Export {
        image_id: 2,
        title: "Photo 2".to_string(),
        source_url: "mem://missing/2".to_string(),
        filter: FilterKind::None,
    });
    wait_for(&engine, |event| {
        matches!(event, EngineEvent::ExportFailed { image_id: 2, .. })
    });

    engine.send(EngineCommand::LoadImage {
        image_id: 3,
        url: "mem://ok/3".to_string(),
    });
    wait_for(&engine, |event| {
        matches!(event, EngineEvent::ImageLoaded { image_id: 3, .. })
    });
    engine.shutdown();
}

#[test]
fn failed_reload_drops_the_cached_image() {
    let output = TempDir::new().unwrap();
    let engine = start_engine(&output);

    engine.send(EngineCommand::LoadImage {
        image_id: 4,
        url: "mem://ok/4".to_string(),
    });
    wait_for(&engine, |event| {
        matches!(event, EngineEvent::ImageLoaded { image_id: 4, .. })
    });

    engine.send(EngineCommand::LoadImage {
        image_id: 4,
        url: "mem://gone/4".to_string(),
    });
    wait_for(&engine, |event| {
        matches!(event, EngineEvent::ImageFailed { image_id: 4, .. })
    });

    engine.send(EngineCommand::Export {
        image_id: 4,
        title: "Photo 4".to_string(),
        source_url: "mem://ok/4".to_string(),
        filter: FilterKind::Sepia,
    });
    wait_for(&engine, |event| {
        matches!(event, EngineEvent::ExportFailed { image_id: 4, .. })
    });
    engine.shutdown();
}
