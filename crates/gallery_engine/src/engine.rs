use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use gallery_core::{FilterKind, ImageDescriptor, ImageId, CATALOG_LIMIT};
use gallery_logging::{gallery_debug, gallery_info, gallery_warn};
use image::{DynamicImage, RgbaImage};
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::mpsc as async_mpsc;
use tokio::task::JoinHandle;

use crate::cache::RasterCache;
use crate::catalog::generate_batch;
use crate::connection::{ConnectionMonitor, ConnectionProbe, ConnectivityEvent, MonitorSettings};
use crate::decode::decode_image;
use crate::export::{export_image, ExportRequest};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::filter::{apply_filter, make_preview};
use crate::idle::{FallbackIdle, IdleHost, QuietPeriodIdle};
use crate::persist::AtomicFileWriter;
use crate::scheduler::{IdleScheduler, SchedulerSettings};
use crate::{EngineEvent, FailureKind};

/// Produces the `exported_utc` stamp written into export sidecars.
pub type UtcClock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    FetchMore {
        start_id: ImageId,
        count: usize,
        delay: Duration,
    },
    LoadImage {
        image_id: ImageId,
        url: String,
    },
    ApplyFilter {
        image_id: ImageId,
        filter: FilterKind,
    },
    ProcessImage {
        task_id: String,
        priority: i32,
        image_id: ImageId,
        filter: FilterKind,
    },
    ProcessBatch {
        task_id: String,
        priority: i32,
        start_id: ImageId,
        count: usize,
    },
    Export {
        image_id: ImageId,
        title: String,
        source_url: String,
        filter: FilterKind,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdleStrategy {
    /// Idle once no command has arrived for the given period.
    QuietPeriod(Duration),
    Fallback(Duration),
}

impl Default for IdleStrategy {
    fn default() -> Self {
        IdleStrategy::QuietPeriod(Duration::from_millis(200))
    }
}

#[derive(Clone)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    pub scheduler: SchedulerSettings,
    pub monitor: MonitorSettings,
    pub idle: IdleStrategy,
    /// Simulated cost of post-processing one batch.
    pub batch_delay: Duration,
    pub output_dir: PathBuf,
    /// Fixed seed for reproducible catalogs; `None` draws from entropy.
    pub rng_seed: Option<u64>,
    /// Most images whose decoded and filtered rasters are kept in memory.
    pub cache_capacity: usize,
    pub clock: UtcClock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            scheduler: SchedulerSettings::default(),
            monitor: MonitorSettings::default(),
            idle: IdleStrategy::default(),
            batch_delay: Duration::from_millis(1500),
            output_dir: PathBuf::from("exports"),
            rng_seed: None,
            cache_capacity: CATALOG_LIMIT,
            clock: Arc::new(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

pub struct EngineHandle {
    cmd_tx: async_mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(
        config: EngineConfig,
        probe: Arc<dyn ConnectionProbe>,
        connectivity: Option<async_mpsc::UnboundedReceiver<ConnectivityEvent>>,
    ) -> io::Result<Self> {
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone()));
        Self::with_fetcher(config, fetcher, probe, connectivity)
    }

    pub fn with_fetcher(
        config: EngineConfig,
        fetcher: Arc<dyn Fetcher>,
        probe: Arc<dyn ConnectionProbe>,
        connectivity: Option<async_mpsc::UnboundedReceiver<ConnectivityEvent>>,
    ) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("gallery-engine-rt")
            .enable_all()
            .build()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let context = Arc::new(EngineContext {
            fetcher,
            events: event_tx,
            rasters: Mutex::new(RasterCache::new(config.cache_capacity)),
            rng: Mutex::new(rng),
            writer: AtomicFileWriter::new(config.output_dir.clone()),
            batch_delay: config.batch_delay,
            clock: config.clock.clone(),
        });

        let worker = thread::Builder::new()
            .name("gallery-engine".to_string())
            .spawn(move || {
                runtime.block_on(run(context, cmd_rx, probe, connectivity, config));
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    pub fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            gallery_warn!("Engine stopped, command dropped");
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Stops the monitor and scheduler and waits for the engine thread.
    /// A background task that is already running completes first.
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                gallery_warn!("Engine thread panicked during shutdown");
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}

async fn run(
    context: Arc<EngineContext>,
    mut commands: async_mpsc::UnboundedReceiver<EngineCommand>,
    probe: Arc<dyn ConnectionProbe>,
    connectivity: Option<async_mpsc::UnboundedReceiver<ConnectivityEvent>>,
    config: EngineConfig,
) {
    let monitor = ConnectionMonitor::start(probe, connectivity, config.monitor.clone()).await;
    let (idle_host, quiet): (Arc<dyn IdleHost>, Option<Arc<QuietPeriodIdle>>) = match config.idle
    {
        IdleStrategy::QuietPeriod(period) => {
            let quiet = Arc::new(QuietPeriodIdle::new(period));
            (quiet.clone(), Some(quiet))
        }
        IdleStrategy::Fallback(delay) => (Arc::new(FallbackIdle::new(delay)), None),
    };
    let scheduler = IdleScheduler::spawn(idle_host, config.scheduler.clone());

    let forwarders = [
        forward(monitor.subscribe(), context.events.clone(), EngineEvent::ConnectionChanged),
        forward(scheduler.subscribe(), context.events.clone(), EngineEvent::SchedulerChanged),
    ];

    gallery_info!("Engine started");
    while let Some(command) = commands.recv().await {
        if let Some(quiet) = &quiet {
            quiet.mark_busy();
        }
        if matches!(command, EngineCommand::Shutdown) {
            break;
        }
        context.handle(command, &scheduler);
    }

    scheduler.shutdown().await;
    monitor.shutdown().await;
    for forwarder in forwarders {
        forwarder.abort();
    }
    gallery_info!("Engine stopped");
}

/// Republishes every value of a watch channel, starting with the current one.
fn forward<T>(
    mut rx: tokio::sync::watch::Receiver<T>,
    events: mpsc::Sender<EngineEvent>,
    wrap: fn(T) -> EngineEvent,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            let value = rx.borrow_and_update().clone();
            if events.send(wrap(value)).is_err() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
}

struct EngineContext {
    fetcher: Arc<dyn Fetcher>,
    events: mpsc::Sender<EngineEvent>,
    rasters: Mutex<RasterCache>,
    rng: Mutex<StdRng>,
    writer: AtomicFileWriter,
    batch_delay: Duration,
    clock: UtcClock,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EngineContext {
    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            gallery_debug!("Event receiver gone");
        }
    }

    fn decoded(&self, image_id: ImageId) -> Option<Arc<DynamicImage>> {
        lock(&self.rasters).decoded(image_id)
    }

    /// A failed reload must not leave an older decode behind.
    fn fail(&self, image_id: ImageId, failure: FailureKind) {
        lock(&self.rasters).forget(image_id);
        self.emit(EngineEvent::ImageFailed { image_id, failure });
    }

    fn handle(self: &Arc<Self>, command: EngineCommand, scheduler: &IdleScheduler) {
        match command {
            EngineCommand::FetchMore {
                start_id,
                count,
                delay,
            } => {
                let ctx = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let images = ctx.next_batch(start_id, count);
                    gallery_info!("Loaded {} images starting at {}", images.len(), start_id);
                    ctx.emit(EngineEvent::BatchReady { images });
                });
            }
            EngineCommand::LoadImage { image_id, url } => {
                let ctx = self.clone();
                tokio::spawn(async move { ctx.load_image(image_id, url).await });
            }
            EngineCommand::ApplyFilter { image_id, filter } => {
                let ctx = self.clone();
                tokio::spawn(async move {
                    if let Err(err) = ctx.filter_image(image_id, filter).await {
                        gallery_warn!("Filter {} on image {} failed: {:#}", filter, image_id, err);
                    }
                });
            }
            EngineCommand::ProcessImage {
                task_id,
                priority,
                image_id,
                filter,
            } => {
                let ctx = self.clone();
                scheduler.enqueue(task_id, priority, move || async move {
                    ctx.process_image(image_id, filter).await
                });
            }
            EngineCommand::ProcessBatch {
                task_id,
                priority,
                start_id,
                count,
            } => {
                let delay = self.batch_delay;
                scheduler.enqueue(task_id, priority, move || async move {
                    tokio::time::sleep(delay).await;
                    gallery_debug!("Processed batch of {} starting at {}", count, start_id);
                    Ok(())
                });
            }
            EngineCommand::Export {
                image_id,
                title,
                source_url,
                filter,
            } => {
                let ctx = self.clone();
                tokio::spawn(async move {
                    let request = ExportRequest {
                        title,
                        source_url,
                        filter,
                        exported_utc: (ctx.clock)(),
                    };
                    match ctx.export(image_id, request).await {
                        Ok(path) => ctx.emit(EngineEvent::Exported { image_id, path }),
                        Err(err) => {
                            gallery_warn!("Export of image {} failed: {:#}", image_id, err);
                            ctx.emit(EngineEvent::ExportFailed {
                                image_id,
                                message: format!("{err:#}"),
                            });
                        }
                    }
                });
            }
            EngineCommand::Shutdown => {}
        }
    }

    fn next_batch(&self, start_id: ImageId, count: usize) -> Vec<ImageDescriptor> {
        generate_batch(&mut *lock(&self.rng), start_id, count)
    }

    async fn load_image(self: Arc<Self>, image_id: ImageId, url: String) {
        gallery_debug!("Loading image {} from {}", image_id, url);
        let output = match self.fetcher.fetch(&url).await {
            Ok(output) => output,
            Err(err) => {
                gallery_warn!("Image {} failed to load: {}", image_id, err);
                self.fail(image_id, err.kind);
                return;
            }
        };

        let decoded = tokio::task::spawn_blocking(move || {
            decode_image(&output.bytes, output.metadata.content_type.as_deref())
        })
        .await;
        match decoded {
            Ok(Ok(decoded)) => {
                let (width, height) = (decoded.width(), decoded.height());
                lock(&self.rasters).insert_decoded(image_id, Arc::new(decoded.image));
                gallery_info!("Image {} loaded ({}x{})", image_id, width, height);
                self.emit(EngineEvent::ImageLoaded {
                    image_id,
                    width,
                    height,
                });
            }
            Ok(Err(err)) => {
                gallery_warn!("Image {} could not be decoded: {}", image_id, err);
                self.fail(image_id, FailureKind::Decode);
            }
            Err(err) => {
                gallery_warn!("Decoder for image {} aborted: {}", image_id, err);
                self.fail(image_id, FailureKind::Decode);
            }
        }
    }

    async fn filtered(
        &self,
        image_id: ImageId,
        filter: FilterKind,
    ) -> anyhow::Result<Arc<RgbaImage>> {
        let cached = lock(&self.rasters).filtered(image_id, filter);
        if let Some(raster) = cached {
            return Ok(raster);
        }
        let image = self
            .decoded(image_id)
            .ok_or_else(|| anyhow!("image {image_id} is not loaded"))?;
        let raster = tokio::task::spawn_blocking(move || apply_filter(&image, filter))
            .await
            .context("filter worker aborted")??;
        let raster = Arc::new(raster);
        lock(&self.rasters).insert_filtered(image_id, filter, raster.clone());
        Ok(raster)
    }

    async fn filter_image(&self, image_id: ImageId, filter: FilterKind) -> anyhow::Result<()> {
        let raster = self.filtered(image_id, filter).await?;
        gallery_debug!("Applied {} to image {}", filter, image_id);
        self.emit(EngineEvent::FilterApplied {
            image_id,
            filter,
            width: raster.width(),
            height: raster.height(),
        });
        Ok(())
    }

    async fn process_image(&self, image_id: ImageId, filter: FilterKind) -> anyhow::Result<()> {
        let image = self
            .decoded(image_id)
            .ok_or_else(|| anyhow!("image {image_id} is not loaded"))?;
        let preview = tokio::task::spawn_blocking(move || make_preview(&image, filter))
            .await
            .context("preview worker aborted")??;
        gallery_debug!(
            "Preview for image {} is {}x{}",
            image_id,
            preview.width(),
            preview.height()
        );
        self.emit(EngineEvent::ImageProcessed {
            image_id,
            preview_width: preview.width(),
            preview_height: preview.height(),
        });
        Ok(())
    }

    async fn export(
        self: &Arc<Self>,
        image_id: ImageId,
        request: ExportRequest,
    ) -> anyhow::Result<PathBuf> {
        let raster = self.filtered(image_id, request.filter).await?;
        let ctx = self.clone();
        let summary =
            tokio::task::spawn_blocking(move || export_image(&ctx.writer, &raster, &request))
                .await
                .context("export worker aborted")??;
        Ok(summary.image_path)
    }
}
