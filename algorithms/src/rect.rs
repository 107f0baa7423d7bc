
use std::fmt::{Debug, Formatter};

/// A rectangle in display coordinates.
///
/// `x2` and `y2` are exclusive. Layer geometry arrives from clients as floats
/// and is kept that way until the engine consumes it.
#[derive(Copy, Clone, PartialEq, Default)]
pub struct FRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Debug for FRect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FRect")
            .field("x1", &self.x1)
            .field("y1", &self.y1)
            .field("x2", &self.x2)
            .field("y2", &self.y2)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl FRect {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn new_sized(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(
            x as f32,
            y as f32,
            x.saturating_add(width) as f32,
            y.saturating_add(height) as f32,
        )
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    /// The smallest rectangle containing both. Empty operands are ignored.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    pub fn intersect(&self, other: &Self) -> Self {
        let res = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        if res.is_empty() {
            return Self::default();
        }
        res
    }

    /// Shrinks the rectangle to whole pixels.
    pub fn round_inward(&self) -> Self {
        Self {
            x1: self.x1.ceil(),
            y1: self.y1.ceil(),
            x2: self.x2.floor(),
            y2: self.y2.floor(),
        }
    }

    pub fn is_integral(&self) -> bool {
        self.x1 == self.x1.round()
            && self.y1 == self.y1.round()
            && self.x2 == self.x2.round()
            && self.y2 == self.y2.round()
    }

    pub fn move_to(&self, x: f32, y: f32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x + self.width(),
            y2: y + self.height(),
        }
    }
}

/// Bounding box of all non-empty rectangles.
pub fn bounding<'a>(rects: impl IntoIterator<Item = &'a FRect>) -> FRect {
    rects
        .into_iter()
        .fold(FRect::default(), |acc, r| acc.union(r))
}
