//! Candidate report types and terminal formatting.

use serde::Serialize;
use std::fmt;

use crate::index::AnnotationIndex;
use crate::ir::{AnnotationId, Annotation, BBox, ImageId, Keypoint, ScaleBucket};

/// Everything a renderer needs to draw the selected image's layers.
#[derive(Clone, Debug, Serialize)]
pub struct CandidateReport {
    pub meta: CandidateMeta,
    /// Per-object boxes for the spatial layer.
    pub spatial: Vec<CandidateObject>,
    /// Distinct categories for the semantic layer.
    pub semantic: SemanticSummary,
    /// Person skeletons for the pose layer.
    pub pose: Vec<PoseEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CandidateMeta {
    pub image_id: ImageId,
    pub file_name: String,
    pub score: usize,
    pub captions: Vec<String>,
}

/// One object of the selected image.
#[derive(Clone, Debug, Serialize)]
pub struct CandidateObject {
    pub id: AnnotationId,
    pub category: String,
    pub bbox: BBox,
    /// Pixel area of the bbox.
    pub area: f64,
    pub scale: ScaleBucket,
    pub iscrowd: bool,
}

impl CandidateObject {
    pub(crate) fn new(ann: &Annotation, index: &AnnotationIndex<'_>) -> Self {
        let area = ann.bbox.area();
        Self {
            id: ann.id,
            category: index
                .category_name(ann.category_id)
                .unwrap_or("unknown")
                .to_string(),
            bbox: ann.bbox,
            area,
            scale: ScaleBucket::from_area(area),
            iscrowd: ann.iscrowd,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SemanticSummary {
    /// Sorted, deduplicated category names.
    pub categories: Vec<String>,
}

/// Keypoints of one person, flattened back to COCO's `[x, y, v, ...]`.
#[derive(Clone, Debug, Serialize)]
pub struct PoseEntry {
    pub id: AnnotationId,
    pub keypoints: Vec<f64>,
    pub bbox: BBox,
}

impl PoseEntry {
    /// `None` when the annotation has no keypoints or none are labeled.
    pub fn from_annotation(ann: &Annotation) -> Option<Self> {
        let keypoints = ann.keypoints.as_deref()?;
        if ann.labeled_keypoints() == 0 {
            return None;
        }
        Some(Self {
            id: ann.id,
            keypoints: Keypoint::to_flat(keypoints),
            bbox: ann.bbox,
        })
    }
}

impl fmt::Display for CandidateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Candidate image {} ({}), score {}",
            self.meta.image_id, self.meta.file_name, self.meta.score
        )?;
        writeln!(
            f,
            "  {} object(s), {} categor{}, {} pose(s)",
            self.spatial.len(),
            self.semantic.categories.len(),
            if self.semantic.categories.len() == 1 {
                "y"
            } else {
                "ies"
            },
            self.pose.len()
        )?;
        if !self.semantic.categories.is_empty() {
            writeln!(f, "  categories: {}", self.semantic.categories.join(", "))?;
        }
        for caption in &self.meta.captions {
            writeln!(f, "  \"{}\"", caption)?;
        }
        Ok(())
    }
}
