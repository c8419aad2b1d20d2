//! Gallery core: pure state machine, quality policy and view-model helpers.
mod catalog;
mod effect;
mod filter;
mod msg;
mod network;
mod state;
mod update;
mod view_model;

pub use catalog::{
    next_batch_size, Category, ImageDescriptor, ImageId, CATALOG_LIMIT, INITIAL_PAGE, PAGE_SIZE,
};
pub use effect::{BackgroundJob, BackgroundJobKind, Effect, DEFAULT_TASK_PRIORITY};
pub use filter::{FilterKind, UnknownFilter};
pub use msg::Msg;
pub use network::{load_more_delay, quality_for, ConnectionSnapshot, EffectiveType, Quality};
pub use state::{BackgroundStatus, GalleryState, ImageEntry, LoadState, Preferences, ViewMode};
pub use update::update;
pub use view_model::{CardView, GalleryViewModel};
