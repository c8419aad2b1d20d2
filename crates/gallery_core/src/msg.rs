use crate::{
    BackgroundStatus, ConnectionSnapshot, FilterKind, ImageDescriptor, ImageId, Preferences,
    ViewMode,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The front-end is ready; request the initial page.
    Started,
    /// Restore persisted filter, view mode and likes.
    RestorePreferences(Preferences),
    /// Engine produced a new batch of catalog entries.
    BatchLoaded { images: Vec<ImageDescriptor> },
    /// Visibility notifier for a card flipped.
    CardVisibility { image_id: ImageId, intersecting: bool },
    /// Visibility notifier for the load-more sentinel flipped.
    SentinelVisibility { intersecting: bool },
    /// Engine finished fetching and decoding an image.
    ImageLoaded {
        image_id: ImageId,
        width: u32,
        height: u32,
    },
    /// Engine failed to fetch or decode an image.
    ImageFailed { image_id: ImageId, reason: String },
    /// Background post-processing for an image finished.
    ImageProcessed { image_id: ImageId },
    /// User picked a filter.
    FilterSelected(FilterKind),
    /// User switched between grid and list.
    ViewModeSelected(ViewMode),
    /// User clicked the heart on a card.
    LikeToggled { image_id: ImageId },
    /// User clicked download on a card.
    ExportRequested { image_id: ImageId },
    /// Connection monitor published a new snapshot.
    ConnectionUpdated(ConnectionSnapshot),
    /// Idle scheduler published a new status.
    BackgroundStatus(BackgroundStatus),
    /// Render tick used to coalesce redraws.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
