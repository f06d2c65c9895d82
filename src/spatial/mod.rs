//! Density grids over normalized box centers.
//!
//! Every annotation with usable image geometry lands in one cell of the
//! global grid. The most frequent categories additionally get a grid of their
//! own; the rest only contribute to the global one.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::CocolensError;
use crate::index::AnnotationIndex;
use crate::ir::{Annotation, CategoryId};
use crate::stats::CategoryTable;

/// Options for [`SpatialGrid::build`].
#[derive(Clone, Debug)]
pub struct SpatialOptions {
    /// Cells per side.
    pub grid_size: usize,
    /// How many of the most frequent categories get their own grid.
    pub top_categories: usize,
}

impl Default for SpatialOptions {
    fn default() -> Self {
        Self {
            grid_size: 20,
            top_categories: 10,
        }
    }
}

/// Largest accepted grid side.
pub const MAX_GRID_SIZE: usize = 1000;

pub fn validate_spatial_options(opts: &SpatialOptions) -> Result<(), CocolensError> {
    if opts.grid_size == 0 {
        return Err(CocolensError::InvalidOptions {
            message: "grid size must be greater than 0".to_string(),
        });
    }
    // Also keeps grid_size * grid_size far from overflowing.
    if opts.grid_size > MAX_GRID_SIZE {
        return Err(CocolensError::InvalidOptions {
            message: format!(
                "grid size {} exceeds the maximum of {MAX_GRID_SIZE}",
                opts.grid_size
            ),
        });
    }
    Ok(())
}

/// Square count grid, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<u64>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Count at `(row, col)`; `None` out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<u64> {
        if row >= self.size || col >= self.size {
            return None;
        }
        Some(self.cells[row * self.size + col])
    }

    pub fn increment(&mut self, row: usize, col: usize) {
        if row < self.size && col < self.size {
            self.cells[row * self.size + col] += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }

    /// Cell-wise sum. Grids of different sizes are left untouched.
    pub fn merge(&mut self, other: &Grid) {
        if other.size != self.size {
            log::warn!(
                "Refusing to merge a {0}x{0} grid into a {1}x{1} grid",
                other.size,
                self.size
            );
            return;
        }
        for (cell, add) in self.cells.iter_mut().zip(&other.cells) {
            *cell += add;
        }
    }

    /// Rows from top (y = 0) to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u64]> {
        self.cells.chunks(self.size.max(1))
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.size))?;
        if self.size > 0 {
            for row in self.rows() {
                seq.serialize_element(row)?;
            }
        }
        seq.end()
    }
}

/// Global and per-category density grids.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialGrid {
    pub grid_size: usize,
    pub global: Grid,
    /// Tracked categories in count order, each with its grid.
    pub by_category: Vec<(CategoryId, String, Grid)>,
    /// Annotations left out because their image geometry was unusable.
    pub invalid_geometry: usize,
}

impl SpatialGrid {
    /// Empty grids, tracking the first `opts.top_categories` rows of `table`.
    pub fn new(table: &CategoryTable, opts: &SpatialOptions) -> Self {
        Self {
            grid_size: opts.grid_size,
            global: Grid::new(opts.grid_size),
            by_category: table
                .rows
                .iter()
                .take(opts.top_categories)
                .map(|row| (row.id, row.name.clone(), Grid::new(opts.grid_size)))
                .collect(),
            invalid_geometry: 0,
        }
    }

    /// Bins every indexed annotation.
    pub fn build(
        index: &AnnotationIndex<'_>,
        table: &CategoryTable,
        opts: &SpatialOptions,
    ) -> Result<Self, CocolensError> {
        validate_spatial_options(opts)?;
        let mut grid = Self::new(table, opts);
        for &ann in index.records() {
            grid.accumulate(index, ann);
        }
        log::info!(
            "Binned {} annotation(s) into a {}x{} grid ({} tracked categories)",
            grid.global.total(),
            grid.grid_size,
            grid.grid_size,
            grid.by_category.len()
        );
        Ok(grid)
    }

    /// Bins one annotation. Returns false when it could not be placed.
    pub fn accumulate(&mut self, index: &AnnotationIndex<'_>, ann: &Annotation) -> bool {
        let center = index
            .image(ann.image_id)
            .filter(|image| image.has_valid_dims())
            .and_then(|image| ann.bbox.center().normalize(image.width, image.height));
        let Some(center) = center else {
            self.invalid_geometry += 1;
            return false;
        };

        let (row, col) = center.grid_cell(self.grid_size);
        self.global.increment(row, col);
        if let Some((_, _, grid)) = self
            .by_category
            .iter_mut()
            .find(|(id, _, _)| *id == ann.category_id)
        {
            grid.increment(row, col);
        }
        true
    }

    /// Folds in grids built over a disjoint set of records with the same
    /// tracked categories.
    pub fn merge(&mut self, other: &SpatialGrid) {
        self.global.merge(&other.global);
        self.invalid_geometry += other.invalid_geometry;
        for (id, _, theirs) in &other.by_category {
            if let Some((_, _, ours)) = self.by_category.iter_mut().find(|(own, _, _)| own == id) {
                ours.merge(theirs);
            }
        }
    }

    pub fn category_grid(&self, name: &str) -> Option<&Grid> {
        self.by_category
            .iter()
            .find(|(_, n, _)| n == name)
            .map(|(_, _, grid)| grid)
    }
}

struct ByCategory<'a>(&'a [(CategoryId, String, Grid)]);

impl Serialize for ByCategory<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (_, name, grid) in self.0 {
            map.serialize_entry(name, grid)?;
        }
        map.end()
    }
}

impl Serialize for SpatialGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("SpatialGrid", 3)?;
        state.serialize_field("global", &self.global)?;
        state.serialize_field("by_category", &ByCategory(&self.by_category))?;
        state.serialize_field("grid_size", &self.grid_size)?;
        state.end()
    }
}
