use std::collections::BTreeMap;
use std::sync::Arc;

use gallery_core::{FilterKind, ImageId};
use gallery_logging::gallery_debug;
use image::{DynamicImage, RgbaImage};

/// Decoded images plus the last filtered raster of each, bounded by image
/// count. When full, the lowest image id goes first.
#[derive(Debug)]
pub(crate) struct RasterCache {
    capacity: usize,
    decoded: BTreeMap<ImageId, Arc<DynamicImage>>,
    filtered: BTreeMap<ImageId, (FilterKind, Arc<RgbaImage>)>,
}

impl RasterCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            decoded: BTreeMap::new(),
            filtered: BTreeMap::new(),
        }
    }

    pub(crate) fn decoded(&self, image_id: ImageId) -> Option<Arc<DynamicImage>> {
        self.decoded.get(&image_id).cloned()
    }

    /// Replaces any earlier decode of `image_id`, dropping its stale filter
    /// result.
    pub(crate) fn insert_decoded(&mut self, image_id: ImageId, image: Arc<DynamicImage>) {
        self.filtered.remove(&image_id);
        self.decoded.insert(image_id, image);
        while self.decoded.len() > self.capacity {
            let Some((evicted, _)) = self.decoded.pop_first() else {
                break;
            };
            self.filtered.remove(&evicted);
            gallery_debug!("Evicted image {} from the raster cache", evicted);
        }
    }

    pub(crate) fn filtered(&self, image_id: ImageId, filter: FilterKind) -> Option<Arc<RgbaImage>> {
        self.filtered
            .get(&image_id)
            .filter(|(cached, _)| *cached == filter)
            .map(|(_, raster)| raster.clone())
    }

    /// Ignored when the source image is no longer cached.
    pub(crate) fn insert_filtered(
        &mut self,
        image_id: ImageId,
        filter: FilterKind,
        raster: Arc<RgbaImage>,
    ) {
        if self.decoded.contains_key(&image_id) {
            self.filtered.insert(image_id, (filter, raster));
        }
    }

    /// Drops everything held for `image_id`.
    pub(crate) fn forget(&mut self, image_id: ImageId) {
        self.decoded.remove(&image_id);
        self.filtered.remove(&image_id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.decoded.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gallery_core::FilterKind;
    use image::{DynamicImage, RgbaImage};

    use super::RasterCache;

    fn image() -> Arc<DynamicImage> {
        Arc::new(DynamicImage::new_rgba8(2, 2))
    }

    fn raster() -> Arc<RgbaImage> {
        Arc::new(RgbaImage::new(2, 2))
    }

    #[test]
    fn lowest_ids_are_evicted_with_their_filter_results() {
        let mut cache = RasterCache::new(2);
        cache.insert_decoded(1, image());
        cache.insert_filtered(1, FilterKind::Sepia, raster());
        cache.insert_decoded(2, image());
        cache.insert_decoded(3, image());

        assert_eq!(cache.len(), 2);
        assert!(cache.decoded(1).is_none());
        assert!(cache.filtered(1, FilterKind::Sepia).is_none());
        assert!(cache.decoded(3).is_some());
    }

    #[test]
    fn filter_result_only_matches_its_filter() {
        let mut cache = RasterCache::new(4);
        cache.insert_decoded(5, image());
        cache.insert_filtered(5, FilterKind::Blur, raster());
        assert!(cache.filtered(5, FilterKind::Blur).is_some());
        assert!(cache.filtered(5, FilterKind::Grayscale).is_none());
    }

    #[test]
    fn forget_and_redecode_drop_stale_results() {
        let mut cache = RasterCache::new(4);
        cache.insert_decoded(7, image());
        cache.insert_filtered(7, FilterKind::Contrast, raster());
        cache.insert_decoded(7, image());
        assert!(cache.filtered(7, FilterKind::Contrast).is_none());

        cache.forget(7);
        assert!(cache.decoded(7).is_none());
        cache.insert_filtered(7, FilterKind::Contrast, raster());
        assert!(cache.filtered(7, FilterKind::Contrast).is_none());
    }
}
