//! Dataset model for cocolens.
//!
//! This module defines the read-only records every pass consumes: categories,
//! images, annotations (with optional pose keypoints) and captions, plus the
//! small geometric types built on top of them.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Newtype ids keep the record families apart, and marker
//!    types keep pixel and normalized coordinates from being mixed.
//!
//! 2. **Permissive Construction**: Records may carry unusable values (zero
//!    image sizes, flat boxes). Each pass decides what it can use and counts
//!    what it skips instead of failing.
//!
//! 3. **One Scale Partition**: Every size class comes from
//!    [`ScaleBucket::from_area`].
//!
//! # Example
//!
//! ```
//! use cocolens::ir::{Annotation, BBox, Category, Dataset, Image};
//!
//! let dataset = Dataset {
//!     categories: vec![Category::new(1u64, "person")],
//!     images: vec![Image::new(1u64, "image.jpg", 640, 480)],
//!     annotations: vec![Annotation::new(
//!         1u64, 1u64, 1u64,
//!         BBox::from_xywh(10.0, 20.0, 90.0, 180.0),
//!     )],
//! };
//! assert_eq!(dataset.annotations[0].area(), 16200.0);
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_coco_json;
mod model;
mod scale;

pub use bbox::BBox;
pub use coord::{Coord, Normalized, Pixel};
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use model::{
    Annotation, Caption, Category, Dataset, Image, Keypoint, Visibility, FALLBACK_SUPERCATEGORY,
};
pub use scale::{ScaleBucket, ScaleDistribution, ScaleThresholds, MEDIUM_AREA_MAX, SMALL_AREA_MAX};
