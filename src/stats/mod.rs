//! Per-category running statistics.
//!
//! One pass over the indexed annotations fills a [`CategoryStats`] for every
//! category: how many objects, their areas relative to the image, their
//! aspect ratios and their COCO size classes. The per-category record lists
//! double as the grouping the stratified sampler draws from, so the whole
//! grouping stays in memory until sampling is done.

pub(crate) mod report;

pub use report::{AreaStats, AspectRatioStats, CategorySummary, CategoryTable};

use std::collections::HashMap;

use crate::index::AnnotationIndex;
use crate::ir::{Annotation, Category, CategoryId, ScaleBucket, ScaleDistribution};

/// Accumulated samples for one category.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryStats<'a> {
    pub count: usize,
    /// Bbox area divided by image area, in accumulation order.
    pub areas: Vec<f64>,
    /// Width over `max(height, 1)`, in accumulation order.
    pub aspect_ratios: Vec<f64>,
    pub scale_distribution: ScaleDistribution,
    /// The annotations that contributed, in accumulation order.
    pub records: Vec<&'a Annotation>,
}

impl<'a> CategoryStats<'a> {
    fn push(&mut self, ann: &'a Annotation, relative_area: f64) {
        self.count += 1;
        self.areas.push(relative_area);
        self.aspect_ratios.push(ann.bbox.aspect_ratio());
        self.scale_distribution
            .record(ScaleBucket::from_area(ann.area()));
        self.records.push(ann);
    }

    fn merge(&mut self, other: CategoryStats<'a>) {
        self.count += other.count;
        self.areas.extend(other.areas);
        self.aspect_ratios.extend(other.aspect_ratios);
        self.scale_distribution.merge(&other.scale_distribution);
        self.records.extend(other.records);
    }
}

/// Statistics for every known category, laid out in index order.
///
/// Every category gets its (empty) stats up front, so accumulation never
/// creates entries and two aggregators over the same index merge entry by
/// entry.
#[derive(Clone, Debug)]
pub struct StatAggregator<'a> {
    entries: Vec<(&'a Category, CategoryStats<'a>)>,
    position: HashMap<CategoryId, usize>,
    invalid_geometry: usize,
}

impl<'a> StatAggregator<'a> {
    /// An empty aggregator with one entry per category of `index`.
    pub fn new(index: &AnnotationIndex<'a>) -> Self {
        let entries: Vec<_> = index
            .categories()
            .iter()
            .map(|&category| (category, CategoryStats::default()))
            .collect();
        let position = entries
            .iter()
            .enumerate()
            .map(|(pos, (category, _))| (category.id, pos))
            .collect();
        Self {
            entries,
            position,
            invalid_geometry: 0,
        }
    }

    /// Runs the full pass over `index.records()`.
    pub fn run(index: &AnnotationIndex<'a>) -> Self {
        let mut aggregator = Self::new(index);
        for &ann in index.records() {
            aggregator.accumulate(index, ann);
        }
        log::info!(
            "Aggregated {} annotation(s) into {} categories ({} with invalid geometry)",
            aggregator.accumulated(),
            aggregator.entries.iter().filter(|(_, s)| s.count > 0).count(),
            aggregator.invalid_geometry
        );
        aggregator
    }

    /// Adds one annotation. Returns false when the record was excluded
    /// because its image is unknown or has a non-positive dimension, or its
    /// category is not part of this aggregator.
    pub fn accumulate(&mut self, index: &AnnotationIndex<'a>, ann: &'a Annotation) -> bool {
        let Some(&pos) = self.position.get(&ann.category_id) else {
            return false;
        };
        let image = match index.image(ann.image_id) {
            Some(image) if image.has_valid_dims() => image,
            _ => {
                log::debug!("Annotation {} excluded: unusable image geometry", ann.id);
                self.invalid_geometry += 1;
                return false;
            }
        };

        let image_area = image.width as f64 * image.height as f64;
        self.entries[pos].1.push(ann, ann.bbox.area() / image_area);
        true
    }

    /// Folds in an aggregator built over a disjoint set of records.
    pub fn merge(&mut self, other: StatAggregator<'a>) {
        self.invalid_geometry += other.invalid_geometry;
        for (category, stats) in other.entries {
            match self.position.get(&category.id) {
                Some(&pos) => self.entries[pos].1.merge(stats),
                None => {
                    self.position.insert(category.id, self.entries.len());
                    self.entries.push((category, stats));
                }
            }
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&CategoryStats<'a>> {
        self.position.get(&id).map(|&pos| &self.entries[pos].1)
    }

    /// All entries in index order, including empty ones.
    pub fn entries(&self) -> &[(&'a Category, CategoryStats<'a>)] {
        &self.entries
    }

    /// Non-empty categories, most frequent first. Equal counts keep index
    /// order.
    pub fn ranked(&self) -> Vec<(&'a Category, &CategoryStats<'a>)> {
        let mut ranked: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, stats)| stats.count > 0)
            .map(|(category, stats)| (*category, stats))
            .collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        ranked
    }

    /// Summary rows for [`ranked`](Self::ranked).
    pub fn summaries(&self) -> CategoryTable {
        CategoryTable {
            rows: self
                .ranked()
                .into_iter()
                .filter_map(|(category, stats)| CategorySummary::from_stats(category, stats))
                .collect(),
        }
    }

    /// Number of annotations that landed in some category.
    pub fn accumulated(&self) -> usize {
        self.entries.iter().map(|(_, stats)| stats.count).sum()
    }

    /// Number of annotations excluded for unusable image geometry.
    pub fn invalid_geometry(&self) -> usize {
        self.invalid_geometry
    }
}
