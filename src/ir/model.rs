//! In-memory dataset model.
//!
//! These are the three record families every pass reads (categories, images,
//! annotations) plus the optional captions. The engine never mutates them.

use serde::Serialize;

use super::bbox::BBox;
use super::ids::{AnnotationId, CategoryId, ImageId};

/// A materialized dataset, as loaded from a COCO instances or keypoints file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub categories: Vec<Category>,
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
}

/// An image record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub id: ImageId,
    pub file_name: String,
    /// Width in pixels. Zero marks an image with unusable geometry.
    pub width: u32,
    pub height: u32,
}

impl Image {
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
        }
    }

    /// True when both dimensions are positive.
    pub fn has_valid_dims(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Supercategory reported for categories that carry none.
pub const FALLBACK_SUPERCATEGORY: &str = "other";

/// A category (class label).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: Option<String>,
    /// Keypoint names, only present on keypoint-annotated categories.
    pub keypoints: Vec<String>,
    /// 1-based keypoint index pairs forming the skeleton.
    pub skeleton: Vec<[u32; 2]>,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
            keypoints: Vec::new(),
            skeleton: Vec::new(),
        }
    }

    pub fn with_supercategory(mut self, supercategory: impl Into<String>) -> Self {
        self.supercategory = Some(supercategory.into());
        self
    }

    pub fn with_keypoints(mut self, names: Vec<String>, skeleton: Vec<[u32; 2]>) -> Self {
        self.keypoints = names;
        self.skeleton = skeleton;
        self
    }

    /// The supercategory, or [`FALLBACK_SUPERCATEGORY`] when absent.
    pub fn supercategory_or_fallback(&self) -> &str {
        self.supercategory
            .as_deref()
            .unwrap_or(FALLBACK_SUPERCATEGORY)
    }
}

/// Keypoint visibility flag (`v` in COCO's `x, y, v` triples).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    NotLabeled,
    LabeledHidden,
    Visible,
}

impl Visibility {
    /// Maps COCO's numeric flag. Anything above 2 is treated as visible.
    pub fn from_flag(v: f64) -> Self {
        if v >= 2.0 {
            Visibility::Visible
        } else if v > 0.0 {
            Visibility::LabeledHidden
        } else {
            Visibility::NotLabeled
        }
    }

    pub fn as_flag(&self) -> f64 {
        match self {
            Visibility::NotLabeled => 0.0,
            Visibility::LabeledHidden => 1.0,
            Visibility::Visible => 2.0,
        }
    }

    /// True for flags 1 and 2: the annotator placed the point.
    pub fn is_labeled(&self) -> bool {
        !matches!(self, Visibility::NotLabeled)
    }
}

/// One keypoint in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub visibility: Visibility,
}

impl Keypoint {
    /// Splits a flat `[x1, y1, v1, x2, ...]` array. A trailing partial triple
    /// is dropped.
    pub fn from_flat(values: &[f64]) -> Vec<Keypoint> {
        values
            .chunks_exact(3)
            .map(|t| Keypoint {
                x: t[0],
                y: t[1],
                visibility: Visibility::from_flag(t[2]),
            })
            .collect()
    }

    pub fn to_flat(keypoints: &[Keypoint]) -> Vec<f64> {
        keypoints
            .iter()
            .flat_map(|k| [k.x, k.y, k.visibility.as_flag()])
            .collect()
    }
}

/// One object instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub bbox: BBox,
    /// Area as supplied by the source (segmentation area for COCO).
    pub supplied_area: Option<f64>,
    pub iscrowd: bool,
    pub keypoints: Option<Vec<Keypoint>>,
    /// COCO's `num_keypoints`, when the source supplied it.
    pub num_keypoints: Option<u32>,
}

impl Annotation {
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBox,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox,
            supplied_area: None,
            iscrowd: false,
            keypoints: None,
            num_keypoints: None,
        }
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.supplied_area = Some(area);
        self
    }

    pub fn with_keypoints(mut self, keypoints: Vec<Keypoint>) -> Self {
        self.keypoints = Some(keypoints);
        self
    }

    /// The supplied area, falling back to the bbox area.
    pub fn area(&self) -> f64 {
        self.supplied_area.unwrap_or_else(|| self.bbox.area())
    }

    /// Number of keypoints the annotator placed. Prefers the source's own
    /// count when it has one.
    pub fn labeled_keypoints(&self) -> usize {
        if let Some(n) = self.num_keypoints {
            return n as usize;
        }
        self.keypoints
            .as_deref()
            .map(|kps| kps.iter().filter(|k| k.visibility.is_labeled()).count())
            .unwrap_or(0)
    }
}

/// A free-text image caption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caption {
    pub image_id: ImageId,
    pub caption: String,
}
