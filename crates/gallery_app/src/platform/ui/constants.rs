/// Pre-trigger distance for revealing cards.
pub const CARD_MARGIN_PX: f64 = 100.0;
/// Pre-trigger distance for the load-more sentinel.
pub const SENTINEL_MARGIN_PX: f64 = 200.0;

pub const HEADER_HEIGHT: f64 = 80.0;
pub const GAP: f64 = 16.0;
pub const GRID_CARD_HEIGHT: f64 = 200.0;
pub const LIST_ROW_HEIGHT: f64 = 120.0;
pub const SENTINEL_HEIGHT: f64 = 20.0;
