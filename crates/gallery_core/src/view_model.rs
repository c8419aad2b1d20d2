use crate::{BackgroundStatus, Category, EffectiveType, FilterKind, ImageId, LoadState, Quality, ViewMode};

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryViewModel {
    pub photo_count: usize,
    pub revealed_count: usize,
    pub online: bool,
    pub effective_type: EffectiveType,
    pub quality: Quality,
    pub filter: FilterKind,
    pub view_mode: ViewMode,
    pub loading: bool,
    pub has_more: bool,
    pub background: BackgroundStatus,
    pub cards: Vec<CardView>,
    pub dirty: bool,
}

impl GalleryViewModel {
    /// "Ready" while the scheduler has nothing running, else "Processing".
    pub fn background_label(&self) -> &'static str {
        if self.background.idle {
            "Ready"
        } else {
            "Processing"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub image_id: ImageId,
    pub title: String,
    pub category: Category,
    pub load: LoadState,
    pub processed: bool,
    pub liked: bool,
}
