//! The combined spatial overview: statistics, grids, histograms and a
//! bounded sample of per-object projections, bundled for one output file.

use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::error::CocolensError;
use crate::histogram::{validate_histogram_options, CategoryHistograms, HistogramOptions};
use crate::index::{AnnotationIndex, SkipCounts};
use crate::ir::{
    Annotation, AnnotationId, CategoryId, Dataset, ImageId, ScaleBucket, ScaleThresholds,
};
use crate::sample::{sample_categories, validate_sample_options, SampleOptions};
use crate::spatial::{validate_spatial_options, SpatialGrid, SpatialOptions};
use crate::stats::report::{format_number, round_to, AREA_PLACES, RATIO_PLACES};
use crate::stats::{CategoryTable, StatAggregator};

#[derive(Clone, Debug, Default)]
pub struct OverviewOptions {
    pub spatial: SpatialOptions,
    pub histogram: HistogramOptions,
    pub sample: SampleOptions,
}

pub fn validate_overview_options(opts: &OverviewOptions) -> Result<(), CocolensError> {
    validate_spatial_options(&opts.spatial)?;
    validate_histogram_options(&opts.histogram)?;
    validate_sample_options(&opts.sample)
}

/// One sampled object, normalized by its image size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleRecord {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub category: String,
    pub supercategory: String,
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
    /// Bbox area over image area.
    pub area: f64,
    pub aspect_ratio: f64,
    /// Pixel area as supplied, falling back to the bbox area.
    pub raw_area: f64,
    pub scale: ScaleBucket,
}

impl SampleRecord {
    /// `None` when the annotation's image or category does not resolve or
    /// the image has a zero side.
    pub fn project(ann: &Annotation, index: &AnnotationIndex<'_>) -> Option<Self> {
        let image = index.image(ann.image_id).filter(|i| i.has_valid_dims())?;
        let category = index.category(ann.category_id)?;
        let (w, h) = (image.width as f64, image.height as f64);
        let center = ann.bbox.center().normalize(image.width, image.height)?;
        Some(Self {
            id: ann.id,
            image_id: ann.image_id,
            category_id: ann.category_id,
            category: category.name.clone(),
            supercategory: category.supercategory_or_fallback().to_string(),
            cx: round_to(center.x, 4),
            cy: round_to(center.y, 4),
            width: round_to(ann.bbox.width / w, 4),
            height: round_to(ann.bbox.height / h, 4),
            area: round_to(ann.bbox.area() / (w * h), AREA_PLACES),
            aspect_ratio: round_to(ann.bbox.aspect_ratio(), RATIO_PLACES),
            raw_area: ann.area(),
            scale: ScaleBucket::from_area(ann.area()),
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OverviewMeta {
    /// Annotations in the input, before any skipping.
    pub total_annotations: usize,
    pub sampled_count: usize,
    pub grid_resolution: usize,
    pub skipped: SkipCounts,
    pub invalid_geometry: usize,
    pub scale_thresholds: ScaleThresholds,
}

#[derive(Clone, Debug, Serialize)]
pub struct Overview {
    pub annotations: Vec<SampleRecord>,
    pub categories: CategoryTable,
    pub spatial_grid: SpatialGrid,
    pub scale_histograms: CategoryHistograms,
    pub meta: OverviewMeta,
}

/// Runs statistics, binning, histograms and sampling over `dataset`.
pub fn build_overview<R: Rng + ?Sized>(
    dataset: &Dataset,
    opts: &OverviewOptions,
    rng: &mut R,
) -> Result<Overview, CocolensError> {
    validate_overview_options(opts)?;

    let index = AnnotationIndex::build(dataset);
    let stats = StatAggregator::run(&index);
    let categories = stats.summaries();
    let spatial_grid = SpatialGrid::build(&index, &categories, &opts.spatial)?;
    let scale_histograms = CategoryHistograms::build(&stats, &opts.histogram)?;
    let sampled = sample_categories(&stats, &opts.sample, rng)?;
    let annotations: Vec<SampleRecord> = sampled
        .into_iter()
        .filter_map(|ann| SampleRecord::project(ann, &index))
        .collect();

    let meta = OverviewMeta {
        total_annotations: dataset.annotations.len(),
        sampled_count: annotations.len(),
        grid_resolution: opts.spatial.grid_size,
        skipped: index.skipped(),
        invalid_geometry: stats.invalid_geometry(),
        scale_thresholds: ScaleThresholds::default(),
    };
    Ok(Overview {
        annotations,
        categories,
        spatial_grid,
        scale_histograms,
        meta,
    })
}

impl fmt::Display for Overview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Overview of {} annotation(s), {} sampled",
            format_number(self.meta.total_annotations),
            format_number(self.meta.sampled_count)
        )?;
        writeln!(
            f,
            "  skipped: {} unknown category, {} unknown image, {} invalid geometry",
            self.meta.skipped.missing_category,
            self.meta.skipped.missing_image,
            self.meta.invalid_geometry
        )?;
        writeln!(
            f,
            "  grid: {0}x{0}, {1} tracked categories; {2} histogram(s)",
            self.meta.grid_resolution,
            self.spatial_grid.by_category.len(),
            self.scale_histograms.entries.len()
        )?;
        write!(f, "{}", self.categories)
    }
}
