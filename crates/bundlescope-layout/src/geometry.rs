//! Rectangles and weighted items.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle; `y` grows downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    pub const fn with_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Length of the shorter side.
    pub fn shorter_side(&self) -> f64 {
        self.width.min(self.height)
    }

    /// Check if the rectangle covers no area.
    pub fn is_degenerate(&self) -> bool {
        // NaN sides count as degenerate too.
        !(self.area() > 0.0)
    }

    /// Area shared with another rectangle.
    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let width = self.right().min(other.right()) - self.x.max(other.x);
        let height = self.bottom().min(other.bottom()) - self.y.max(other.y);
        width.max(0.0) * height.max(0.0)
    }
}

/// Anything that can be laid out proportionally to a weight.
pub trait Weighted {
    /// Relative weight; non-positive weights are never laid out.
    fn weight(&self) -> f64;
}

impl Weighted for f64 {
    fn weight(&self) -> f64 {
        *self
    }
}

impl Weighted for u64 {
    fn weight(&self) -> f64 {
        *self as f64
    }
}

impl<T: Weighted + ?Sized> Weighted for &T {
    fn weight(&self) -> f64 {
        (**self).weight()
    }
}
