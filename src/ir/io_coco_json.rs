//! COCO JSON reader.
//!
//! Reads instance and person-keypoint files (both share one schema) and
//! caption files into the in-memory model.
//!
//! # COCO Format Reference
//!
//! COCO bounding boxes use `[x, y, width, height]` in absolute pixels with
//! `(x, y)` at the top-left corner. Keypoints are a flat `[x, y, v, ...]`
//! array where `v` is 0 (not labeled), 1 (labeled, hidden) or 2 (visible).
//!
//! The three record families (`categories`, `images`, `annotations`) must all
//! be present. A file missing one of them is rejected before any pass runs;
//! an empty list is accepted.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::model::{Annotation, Caption, Category, Dataset, Image, Keypoint};
use super::{AnnotationId, BBox, CategoryId, ImageId};
use crate::error::CocolensError;

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Deserialize)]
struct CocoDataset {
    #[serde(default)]
    categories: Option<Vec<CocoCategory>>,

    #[serde(default)]
    images: Option<Vec<CocoImage>>,

    #[serde(default)]
    annotations: Option<Vec<CocoAnnotation>>,
}

#[derive(Debug, Deserialize)]
struct CocoImage {
    id: u64,
    /// Signed so that malformed negative sizes parse and are excluded later.
    width: i64,
    height: i64,
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,

    #[serde(default)]
    supercategory: Option<String>,

    #[serde(default)]
    keypoints: Vec<String>,

    #[serde(default)]
    skeleton: Vec<[u32; 2]>,
}

#[derive(Debug, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,

    bbox: [f64; 4],

    #[serde(default)]
    area: Option<f64>,

    #[serde(default)]
    iscrowd: Option<u8>,

    #[serde(default)]
    keypoints: Option<Vec<f64>>,

    #[serde(default)]
    num_keypoints: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CocoCaptions {
    #[serde(default)]
    annotations: Option<Vec<CocoCaption>>,
}

#[derive(Debug, Deserialize)]
struct CocoCaption {
    image_id: u64,
    caption: String,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a dataset from a COCO instances or keypoints JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if one of the
/// three record families is missing entirely.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use cocolens::ir::io_coco_json::read_coco_json;
///
/// let dataset = read_coco_json(Path::new("instances_train2017.json"))?;
/// # Ok::<(), cocolens::CocolensError>(())
/// ```
pub fn read_coco_json(path: &Path) -> Result<Dataset, CocolensError> {
    let file = File::open(path).map_err(CocolensError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoDataset =
        serde_json::from_reader(reader).map_err(|source| CocolensError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    let dataset = coco_to_dataset(coco, &path.display().to_string())?;
    log::info!(
        "Loaded {}: {} categories, {} images, {} annotations",
        path.display(),
        dataset.categories.len(),
        dataset.images.len(),
        dataset.annotations.len()
    );
    Ok(dataset)
}

/// Reads a dataset from a COCO JSON string.
///
/// Useful for testing without file I/O.
pub fn from_coco_str(json: &str) -> Result<Dataset, CocolensError> {
    let coco: CocoDataset =
        serde_json::from_str(json).map_err(|source| CocolensError::CocoJsonParse {
            path: PathBuf::from("<string>"),
            source,
        })?;
    coco_to_dataset(coco, "<string>")
}

/// Reads a dataset from a COCO JSON byte slice.
///
/// Useful for fuzzing and processing raw bytes without UTF-8 validation overhead.
pub fn from_coco_slice(bytes: &[u8]) -> Result<Dataset, CocolensError> {
    let coco: CocoDataset =
        serde_json::from_slice(bytes).map_err(|source| CocolensError::CocoJsonParse {
            path: PathBuf::from("<bytes>"),
            source,
        })?;
    coco_to_dataset(coco, "<bytes>")
}

/// Reads the captions of a COCO captions file.
///
/// Only the `annotations` list is consulted; a file without one yields no
/// captions.
pub fn read_coco_captions(path: &Path) -> Result<Vec<Caption>, CocolensError> {
    let file = File::open(path).map_err(CocolensError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoCaptions =
        serde_json::from_reader(reader).map_err(|source| CocolensError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(captions_from(coco))
}

/// Reads captions from a COCO captions JSON string.
pub fn captions_from_str(json: &str) -> Result<Vec<Caption>, CocolensError> {
    let coco: CocoCaptions =
        serde_json::from_str(json).map_err(|source| CocolensError::CocoJsonParse {
            path: PathBuf::from("<string>"),
            source,
        })?;
    Ok(captions_from(coco))
}

// ============================================================================
// Conversion: COCO -> model
// ============================================================================

fn coco_to_dataset(coco: CocoDataset, origin: &str) -> Result<Dataset, CocolensError> {
    let missing = |family: &'static str| CocolensError::MissingRecordFamily {
        origin: origin.to_string(),
        family,
    };

    let categories = coco.categories.ok_or_else(|| missing("categories"))?;
    let images = coco.images.ok_or_else(|| missing("images"))?;
    let annotations = coco.annotations.ok_or_else(|| missing("annotations"))?;

    let categories = categories
        .into_iter()
        .map(|cat| Category {
            id: CategoryId::new(cat.id),
            name: cat.name,
            supercategory: cat.supercategory,
            keypoints: cat.keypoints,
            skeleton: cat.skeleton,
        })
        .collect();

    let images = images
        .into_iter()
        .map(|img| Image {
            id: ImageId::new(img.id),
            file_name: img.file_name,
            width: u32::try_from(img.width).unwrap_or(0),
            height: u32::try_from(img.height).unwrap_or(0),
        })
        .collect();

    let annotations = annotations
        .into_iter()
        .map(|ann| Annotation {
            id: AnnotationId::new(ann.id),
            image_id: ImageId::new(ann.image_id),
            category_id: CategoryId::new(ann.category_id),
            bbox: BBox::from(ann.bbox),
            supplied_area: ann.area,
            iscrowd: ann.iscrowd.unwrap_or(0) != 0,
            keypoints: ann.keypoints.as_deref().map(Keypoint::from_flat),
            num_keypoints: ann.num_keypoints,
        })
        .collect();

    Ok(Dataset {
        categories,
        images,
        annotations,
    })
}

fn captions_from(coco: CocoCaptions) -> Vec<Caption> {
    coco.annotations
        .unwrap_or_default()
        .into_iter()
        .map(|c| Caption {
            image_id: ImageId::new(c.image_id),
            caption: c.caption,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Visibility;

    fn sample_coco_json() -> &'static str {
        r#"{
            "info": {"year": 2017, "description": "COCO sample"},
            "images": [
                {"id": 1, "width": 640, "height": 480, "file_name": "000000000001.jpg"},
                {"id": 2, "width": -5, "height": 480, "file_name": "broken.jpg"}
            ],
            "categories": [
                {
                    "id": 1, "name": "person", "supercategory": "person",
                    "keypoints": ["nose", "left_eye"],
                    "skeleton": [[1, 2]]
                },
                {"id": 3, "name": "car", "supercategory": "vehicle"}
            ],
            "annotations": [
                {
                    "id": 10, "image_id": 1, "category_id": 1,
                    "bbox": [10.0, 20.0, 90.0, 60.0],
                    "area": 4100.5, "iscrowd": 0,
                    "segmentation": [[10, 20, 100, 20, 100, 80]],
                    "keypoints": [20, 30, 2, 0, 0, 0],
                    "num_keypoints": 1
                },
                {
                    "id": 11, "image_id": 1, "category_id": 3,
                    "bbox": [0, 0, 5, 5], "iscrowd": 1
                }
            ]
        }"#
    }

    #[test]
    fn test_coco_to_model_basic() {
        let dataset = from_coco_str(sample_coco_json()).expect("parse failed");

        assert_eq!(dataset.images.len(), 2);
        assert_eq!(dataset.categories.len(), 2);
        assert_eq!(dataset.annotations.len(), 2);

        let person = &dataset.categories[0];
        assert_eq!(person.supercategory.as_deref(), Some("person"));
        assert_eq!(person.keypoints, vec!["nose", "left_eye"]);
        assert_eq!(person.skeleton, vec![[1, 2]]);

        let ann = &dataset.annotations[0];
        assert_eq!(ann.bbox.to_array(), [10.0, 20.0, 90.0, 60.0]);
        assert_eq!(ann.area(), 4100.5);
        assert!(!ann.iscrowd);
        let kps = ann.keypoints.as_ref().expect("keypoints");
        assert_eq!(kps[0].visibility, Visibility::Visible);
        assert_eq!(kps[1].visibility, Visibility::NotLabeled);
        assert_eq!(ann.num_keypoints, Some(1));
    }

    #[test]
    fn test_missing_area_and_crowd_flag() {
        let dataset = from_coco_str(sample_coco_json()).expect("parse failed");
        let ann = &dataset.annotations[1];
        assert_eq!(ann.supplied_area, None);
        assert_eq!(ann.area(), 25.0);
        assert!(ann.iscrowd);
    }

    #[test]
    fn test_negative_dimensions_become_zero() {
        let dataset = from_coco_str(sample_coco_json()).expect("parse failed");
        assert_eq!(dataset.images[1].width, 0);
        assert!(!dataset.images[1].has_valid_dims());
    }

    #[test]
    fn test_missing_family_is_fatal() {
        let json = r#"{"images": [], "categories": []}"#;
        let err = from_coco_str(json).unwrap_err();
        match err {
            CocolensError::MissingRecordFamily { family, .. } => assert_eq!(family, "annotations"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_families_are_accepted() {
        let json = r#"{"images": [], "categories": [], "annotations": []}"#;
        let dataset = from_coco_str(json).expect("empty lists are valid");
        assert!(dataset.annotations.is_empty());
    }

    #[test]
    fn test_captions_parse() {
        let json = r#"{"annotations": [
            {"id": 1, "image_id": 7, "caption": "A group of people at a table."},
            {"id": 2, "image_id": 8, "caption": "A dog."}
        ]}"#;
        let captions = captions_from_str(json).expect("parse failed");
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].image_id, ImageId::new(7));
    }
}
