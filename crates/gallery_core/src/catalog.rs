use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Quality;

pub type ImageId = u64;

/// Images shown before the first load-more.
pub const INITIAL_PAGE: usize = 16;
/// Images appended per load-more.
pub const PAGE_SIZE: usize = 8;
/// Load-more stops once the gallery holds this many images.
pub const CATALOG_LIMIT: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nature,
    City,
    People,
    Abstract,
    Food,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Nature,
        Category::City,
        Category::People,
        Category::Abstract,
        Category::Food,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Nature => "nature",
            Category::City => "city",
            Category::People => "people",
            Category::Abstract => "abstract",
            Category::Food => "food",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub id: ImageId,
    pub url: String,
    pub thumb_url: String,
    pub title: String,
    pub category: Category,
    pub width: u32,
    pub height: u32,
}

impl ImageDescriptor {
    pub fn new(id: ImageId, category: Category, width: u32, height: u32) -> Self {
        Self {
            id,
            url: format!("https://picsum.photos/{width}/{height}?random={id}"),
            thumb_url: format!("https://picsum.photos/200/150?random={id}"),
            title: format!("Photo {id}"),
            category,
            width,
            height,
        }
    }

    /// URL of the variant to request for the given quality tier.
    ///
    /// High asks for the full image, medium for the thumbnail, low for a
    /// narrower thumbnail (`/100/150`).
    pub fn url_for(&self, quality: Quality) -> String {
        match quality {
            Quality::High => self.url.clone(),
            Quality::Medium => self.thumb_url.clone(),
            Quality::Low => shrink_thumbnail(&self.thumb_url),
        }
    }
}

fn shrink_thumbnail(thumb_url: &str) -> String {
    let Ok(mut parsed) = Url::parse(thumb_url) else {
        return thumb_url.to_string();
    };
    let segments: Vec<String> = match parsed.path_segments() {
        Some(segments) => segments.map(ToOwned::to_owned).collect(),
        None => return thumb_url.to_string(),
    };
    let [width, height] = segments.as_slice() else {
        return thumb_url.to_string();
    };
    let narrowed = match width.parse::<u32>() {
        Ok(w) => (w / 2).max(1).to_string(),
        Err(_) => width.clone(),
    };
    parsed.set_path(&format!("/{narrowed}/{height}"));
    parsed.to_string()
}

/// Number of images the next load-more should request, or 0 when full.
pub fn next_batch_size(current: usize) -> usize {
    CATALOG_LIMIT.saturating_sub(current).min(PAGE_SIZE)
}
