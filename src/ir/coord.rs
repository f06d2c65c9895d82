//! Points tagged with the coordinate space they live in.
//!
//! Bounding-box centers start in pixel space and are divided by the image
//! size before binning. The marker types keep the two from being mixed up.

use serde::Serialize;
use std::marker::PhantomData;

/// Marker for absolute pixel coordinates, origin at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker for coordinates expressed as a fraction of the image size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Normalized {}

/// A 2D point in the coordinate space `TSpace`.
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }
}

impl Coord<Pixel> {
    /// Divides by the image size.
    ///
    /// Returns `None` when either dimension is zero, which is how images with
    /// invalid geometry drop out of every spatial computation.
    pub fn normalize(&self, image_width: u32, image_height: u32) -> Option<Coord<Normalized>> {
        if image_width == 0 || image_height == 0 {
            return None;
        }
        Some(Coord::new(
            self.x / image_width as f64,
            self.y / image_height as f64,
        ))
    }
}

impl Coord<Normalized> {
    /// Maps the point onto a `grid_size`×`grid_size` grid as `(row, col)`.
    ///
    /// Row follows y and column follows x. Points outside `[0, 1]` (boxes
    /// hanging off the image edge) are clamped onto the border cells.
    pub fn grid_cell(&self, grid_size: usize) -> (usize, usize) {
        (axis_cell(self.y, grid_size), axis_cell(self.x, grid_size))
    }
}

fn axis_cell(value: f64, grid_size: usize) -> usize {
    let last = grid_size.saturating_sub(1);
    let scaled = (value * grid_size as f64).floor();
    if !scaled.is_finite() || scaled <= 0.0 {
        0
    } else {
        (scaled as usize).min(last)
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Serialize for Coord<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Coord", 2)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.end()
    }
}
