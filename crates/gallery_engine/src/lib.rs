//! Gallery engine: background scheduling, connection monitoring, viewport
//! tracking and the image IO pipeline behind the pure gallery core.
mod cache;
mod catalog;
mod connection;
mod decode;
mod engine;
mod export;
mod fetch;
mod filename;
mod filter;
mod idle;
mod persist;
mod probe;
mod queue;
mod scheduler;
mod types;
mod viewport;
mod visibility;

pub use catalog::generate_batch;
pub use connection::{
    ConnectionDetails, ConnectionMonitor, ConnectionProbe, ConnectionReading, ConnectivityEvent,
    MonitorSettings, NullProbe, SimulatedProbe,
};
pub use decode::{decode_image, DecodeError, DecodedImage};
pub use engine::{EngineCommand, EngineConfig, EngineHandle, IdleStrategy, UtcClock};
pub use export::{export_image, ExportError, ExportRequest, ExportSummary};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{export_filename, sidecar_filename};
pub use filter::{apply_filter, make_preview, FilterError, PREVIEW_EDGE};
pub use idle::{request_idle, FallbackIdle, IdleGrant, IdleHost, QuietPeriodIdle, IDLE_BUDGET};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use probe::{HttpProbe, HttpProbeSettings};
pub use queue::{BackgroundTask, TaskFuture, TaskQueue};
pub use scheduler::{IdleScheduler, SchedulerSettings, SchedulerStatus};
pub use types::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput};
pub use viewport::{Margin, Rect};
pub use visibility::{
    IntersectionEntry, IntersectionHost, IntersectionSink, ObservationId, ObserverOptions,
    ScrollViewport, VisibilityNotifier,
};
