use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{next_batch_size, CATALOG_LIMIT, INITIAL_PAGE};
use crate::network::{load_more_delay, quality_for};
use crate::view_model::{CardView, GalleryViewModel};
use crate::{ConnectionSnapshot, FilterKind, ImageDescriptor, ImageId, Quality};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Not yet scrolled into view; nothing requested.
    Hidden,
    Loading { url: String },
    Loaded { width: u32, height: u32 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub descriptor: ImageDescriptor,
    pub load: LoadState,
    pub processed: bool,
    pub liked: bool,
}

impl ImageEntry {
    fn new(descriptor: ImageDescriptor, liked: bool) -> Self {
        Self {
            descriptor,
            load: LoadState::Hidden,
            processed: false,
            liked,
        }
    }

    pub fn is_revealed(&self) -> bool {
        !matches!(self.load, LoadState::Hidden)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.load, LoadState::Loaded { .. })
    }
}

/// Mirror of the idle scheduler's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundStatus {
    pub idle: bool,
    pub queue_len: usize,
    pub current_task: Option<String>,
}

impl Default for BackgroundStatus {
    fn default() -> Self {
        Self {
            idle: true,
            queue_len: 0,
            current_task: None,
        }
    }
}

/// User choices that survive restarts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub filter: FilterKind,
    pub view_mode: ViewMode,
    pub liked: Vec<ImageId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GalleryState {
    images: BTreeMap<ImageId, ImageEntry>,
    liked: BTreeSet<ImageId>,
    filter: FilterKind,
    view_mode: ViewMode,
    connection: Option<ConnectionSnapshot>,
    background: BackgroundStatus,
    started: bool,
    loading: bool,
    has_more: bool,
    sentinel_intersecting: bool,
    dirty: bool,
}

impl GalleryState {
    pub fn new() -> Self {
        Self {
            has_more: true,
            ..Self::default()
        }
    }

    pub fn view(&self) -> GalleryViewModel {
        let quality = self.quality();
        let cards = self
            .images
            .values()
            .map(|entry| CardView {
                image_id: entry.descriptor.id,
                title: entry.descriptor.title.clone(),
                category: entry.descriptor.category,
                load: entry.load.clone(),
                processed: entry.processed,
                liked: entry.liked,
            })
            .collect();
        GalleryViewModel {
            photo_count: self.images.len(),
            revealed_count: self.images.values().filter(|e| e.is_revealed()).count(),
            online: self.connection.as_ref().map(|c| c.online).unwrap_or(true),
            effective_type: self
                .connection
                .as_ref()
                .map(|c| c.effective_type)
                .unwrap_or_default(),
            quality,
            filter: self.filter,
            view_mode: self.view_mode,
            loading: self.loading,
            has_more: self.has_more,
            background: self.background.clone(),
            cards,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            filter: self.filter,
            view_mode: self.view_mode,
            liked: self.liked.iter().copied().collect(),
        }
    }

    pub fn image(&self, image_id: ImageId) -> Option<&ImageEntry> {
        self.images.get(&image_id)
    }

    pub fn filter(&self) -> FilterKind {
        self.filter
    }

    /// Evaluated on demand so it always reflects the latest snapshot.
    pub fn quality(&self) -> Quality {
        quality_for(self.connection.as_ref().map(|c| c.effective_type))
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn restore_preferences(&mut self, prefs: Preferences) {
        self.filter = prefs.filter;
        self.view_mode = prefs.view_mode;
        self.liked = prefs.liked.into_iter().collect();
        for entry in self.images.values_mut() {
            entry.liked = self.liked.contains(&entry.descriptor.id);
        }
        self.mark_dirty();
    }

    /// Flags the initial page as in flight. Returns `(start_id, count)` the
    /// first time only.
    pub(crate) fn begin_initial_load(&mut self) -> Option<(ImageId, usize)> {
        if self.started {
            return None;
        }
        self.started = true;
        self.loading = true;
        self.mark_dirty();
        Some((self.next_image_id(), INITIAL_PAGE))
    }

    /// Starts a load-more if the sentinel is in view and nothing is pending.
    pub(crate) fn try_begin_load_more(&mut self) -> Option<(ImageId, usize, std::time::Duration)> {
        if !self.sentinel_intersecting || !self.has_more || self.loading || !self.started {
            return None;
        }
        let count = next_batch_size(self.images.len());
        if count == 0 {
            self.has_more = false;
            return None;
        }
        self.loading = true;
        self.mark_dirty();
        let effective_type = self
            .connection
            .as_ref()
            .map(|c| c.effective_type)
            .unwrap_or_default();
        Some((self.next_image_id(), count, load_more_delay(effective_type)))
    }

    pub(crate) fn set_sentinel_intersecting(&mut self, intersecting: bool) {
        self.sentinel_intersecting = intersecting;
    }

    /// Appends a batch and returns the id of its first image, if any.
    pub(crate) fn append_batch(&mut self, images: Vec<ImageDescriptor>) -> Option<ImageId> {
        self.loading = false;
        let first = images.first().map(|d| d.id);
        for descriptor in images {
            let liked = self.liked.contains(&descriptor.id);
            self.images
                .entry(descriptor.id)
                .or_insert_with(|| ImageEntry::new(descriptor, liked));
        }
        self.has_more = self.images.len() < CATALOG_LIMIT;
        self.mark_dirty();
        first
    }

    /// Moves a hidden card to loading. Returns the URL to request, chosen by
    /// the current quality tier; `None` if the card was already revealed.
    pub(crate) fn reveal(&mut self, image_id: ImageId) -> Option<String> {
        let quality = self.quality();
        let entry = self.images.get_mut(&image_id)?;
        if entry.is_revealed() {
            return None;
        }
        let url = entry.descriptor.url_for(quality);
        entry.load = LoadState::Loading { url: url.clone() };
        self.dirty = true;
        Some(url)
    }

    /// Load results only land on a card that is waiting for one; anything
    /// else is a stale event and is ignored.
    pub(crate) fn apply_loaded(&mut self, image_id: ImageId, width: u32, height: u32) -> bool {
        let Some(entry) = self.loading_entry(image_id) else {
            return false;
        };
        entry.load = LoadState::Loaded { width, height };
        self.dirty = true;
        true
    }

    pub(crate) fn apply_failed(&mut self, image_id: ImageId, reason: String) -> bool {
        let Some(entry) = self.loading_entry(image_id) else {
            return false;
        };
        entry.load = LoadState::Failed { reason };
        self.dirty = true;
        true
    }

    fn loading_entry(&mut self, image_id: ImageId) -> Option<&mut ImageEntry> {
        self.images
            .get_mut(&image_id)
            .filter(|entry| matches!(entry.load, LoadState::Loading { .. }))
    }

    pub(crate) fn apply_processed(&mut self, image_id: ImageId) {
        if let Some(entry) = self.images.get_mut(&image_id) {
            entry.processed = true;
            self.dirty = true;
        }
    }

    /// Changes the filter and returns the loaded images it must be re-applied to.
    pub(crate) fn select_filter(&mut self, filter: FilterKind) -> Vec<ImageId> {
        if self.filter == filter {
            return Vec::new();
        }
        self.filter = filter;
        self.mark_dirty();
        self.images
            .values()
            .filter(|entry| entry.is_loaded())
            .map(|entry| entry.descriptor.id)
            .collect()
    }

    pub(crate) fn select_view_mode(&mut self, mode: ViewMode) {
        if self.view_mode != mode {
            self.view_mode = mode;
            self.mark_dirty();
        }
    }

    pub(crate) fn toggle_like(&mut self, image_id: ImageId) {
        let Some(entry) = self.images.get_mut(&image_id) else {
            return;
        };
        entry.liked = !entry.liked;
        if entry.liked {
            self.liked.insert(image_id);
        } else {
            self.liked.remove(&image_id);
        }
        self.dirty = true;
    }

    pub(crate) fn set_connection(&mut self, snapshot: ConnectionSnapshot) {
        if self.connection.as_ref() != Some(&snapshot) {
            self.connection = Some(snapshot);
            self.mark_dirty();
        }
    }

    pub(crate) fn set_background(&mut self, status: BackgroundStatus) {
        if self.background != status {
            self.background = status;
            self.mark_dirty();
        }
    }

    fn next_image_id(&self) -> ImageId {
        self.images.keys().next_back().map_or(1, |last| last + 1)
    }
}
