// src/geometry.rs
//! Rectangles in virtual-desktop coordinates. x,y from top left.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn position(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    pub const fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    #[must_use]
    pub const fn with_position(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }

    #[must_use]
    pub const fn with_size(self, width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub const fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2,
            y: self.y + self.height / 2,
        }
    }

    pub const fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }

    /// Top-left corner that centres a `size` box inside `self`.
    pub const fn centered_origin(&self, size: Size) -> Point {
        Point {
            x: self.x + (self.width - size.width) / 2,
            y: self.y + (self.height - size.height) / 2,
        }
    }

    /// Top-left corner `margin` pixels in from `self`'s origin on both axes.
    pub const fn offset_origin(&self, margin: i32) -> Point {
        Point {
            x: self.x + margin,
            y: self.y + margin,
        }
    }

    /// Grows the rect outward by the given edge thicknesses.
    #[must_use]
    pub const fn inflate(self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: self.x - left,
            y: self.y - top,
            width: self.width + left + right,
            height: self.height + top + bottom,
        }
    }
}
