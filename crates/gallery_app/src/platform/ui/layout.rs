use gallery_core::ViewMode;
use gallery_engine::Rect;

use super::constants::*;

/// Document geometry of the gallery: header, then cards, then the sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryLayout {
    pub viewport_width: f64,
    pub columns: usize,
}

impl GalleryLayout {
    pub fn new(viewport_width: f64, columns: usize) -> Self {
        Self {
            viewport_width,
            columns: columns.max(1),
        }
    }

    pub fn card_rect(&self, index: usize, mode: ViewMode) -> Rect {
        match mode {
            ViewMode::Grid => {
                let columns = self.columns as f64;
                let width = (self.viewport_width - GAP * (columns + 1.0)) / columns;
                let column = (index % self.columns) as f64;
                let row = (index / self.columns) as f64;
                Rect::new(
                    GAP + column * (width + GAP),
                    self.row_top(row, GRID_CARD_HEIGHT),
                    width,
                    GRID_CARD_HEIGHT,
                )
            }
            ViewMode::List => Rect::new(
                GAP,
                self.row_top(index as f64, LIST_ROW_HEIGHT),
                self.viewport_width - 2.0 * GAP,
                LIST_ROW_HEIGHT,
            ),
        }
    }

    /// Sits directly below the last row of `count` cards.
    pub fn sentinel_rect(&self, count: usize, mode: ViewMode) -> Rect {
        let (rows, height) = match mode {
            ViewMode::Grid => (count.div_ceil(self.columns), GRID_CARD_HEIGHT),
            ViewMode::List => (count, LIST_ROW_HEIGHT),
        };
        Rect::new(
            0.0,
            self.row_top(rows as f64, height),
            self.viewport_width,
            SENTINEL_HEIGHT,
        )
    }

    pub fn content_height(&self, count: usize, mode: ViewMode) -> f64 {
        self.sentinel_rect(count, mode).bottom()
    }

    fn row_top(&self, row: f64, row_height: f64) -> f64 {
        HEADER_HEIGHT + GAP + row * (row_height + GAP)
    }
}
