/// Axis-aligned rectangle in document pixels. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap of two rectangles. Touching edges count as a zero-area overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    /// Grows the rectangle outwards by `margin` (negative values shrink it).
    pub fn expand(&self, margin: Margin) -> Rect {
        Rect::new(
            self.x - margin.left,
            self.y - margin.top,
            self.width + margin.left + margin.right,
            self.height + margin.top + margin.bottom,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margin {
    pub const fn uniform(px: f64) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }
}
