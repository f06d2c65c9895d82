//! Bounding boxes in COCO's native `[x, y, width, height]` layout.

use serde::Serialize;

use super::coord::{Coord, Pixel};

/// An axis-aligned box in pixel space with `(x, y)` at the top-left corner.
///
/// Width and height are not checked on construction. Negative or zero sizes
/// are representable so that the passes can decide per computation whether
/// the box is usable.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `width * height`, the pixel area of the box itself.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    #[inline]
    pub fn center(&self) -> Coord<Pixel> {
        Coord::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Width over height, with the height floored at one pixel so that flat
    /// boxes do not divide by zero.
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height.max(1.0)
    }

    /// True when either side is zero or negative.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    #[inline]
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x, y, w, h]: [f64; 4]) -> Self {
        Self::from_xywh(x, y, w, h)
    }
}

// Serialized as the COCO array so renderers can use it unchanged.
impl Serialize for BBox {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}
