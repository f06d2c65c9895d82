//! Best-example image selection.
//!
//! Every annotated image is described by its composition (people, distinct
//! categories, object count, whether it mixes small and large objects). Images
//! passing all filters are scored and the best one is picked.

mod report;

pub use report::{CandidateMeta, CandidateObject, CandidateReport, PoseEntry, SemanticSummary};

use std::collections::BTreeSet;

use crate::error::CocolensError;
use crate::index::{AnnotationIndex, ImageGroup};
use crate::ir::{Annotation, Caption, Image, ImageId, MEDIUM_AREA_MAX, SMALL_AREA_MAX};

/// Filters an image must pass to become a candidate.
#[derive(Clone, Debug)]
pub struct CandidateOptions {
    /// Inclusive lower bound on the number of people.
    pub min_persons: usize,
    /// Inclusive upper bound on the number of people.
    pub max_persons: usize,
    /// Minimum number of distinct category names.
    pub min_categories: usize,
    /// Minimum number of annotations in the image.
    pub min_objects: usize,
    /// Category name counted as a person.
    pub person_category: String,
}

impl Default for CandidateOptions {
    fn default() -> Self {
        Self {
            min_persons: 3,
            max_persons: 6,
            min_categories: 4,
            min_objects: 8,
            person_category: "person".to_string(),
        }
    }
}

/// Validate candidate options before running.
pub fn validate_candidate_options(opts: &CandidateOptions) -> Result<(), CocolensError> {
    if opts.min_persons > opts.max_persons {
        return Err(CocolensError::InvalidOptions {
            message: format!(
                "--min-persons ({}) must not exceed --max-persons ({})",
                opts.min_persons, opts.max_persons
            ),
        });
    }
    if opts.person_category.is_empty() {
        return Err(CocolensError::InvalidOptions {
            message: "--person-category must not be empty".to_string(),
        });
    }
    Ok(())
}

/// What one image contains.
#[derive(Clone, Debug)]
pub struct ImageComposition<'a> {
    pub image_id: ImageId,
    pub person_count: usize,
    pub category_names: BTreeSet<&'a str>,
    pub object_count: usize,
    /// Some box has pixel area below 32².
    pub has_small: bool,
    /// Some box has pixel area above 96².
    pub has_large: bool,
}

impl<'a> ImageComposition<'a> {
    /// Describes one image group. Scale is judged on the bbox area, not the
    /// supplied segmentation area.
    pub fn of(group: &ImageGroup<'a>, index: &AnnotationIndex<'a>, person_category: &str) -> Self {
        let mut composition = Self {
            image_id: group.image.id,
            person_count: 0,
            category_names: BTreeSet::new(),
            object_count: group.annotations.len(),
            has_small: false,
            has_large: false,
        };

        for ann in &group.annotations {
            if let Some(name) = index.category_name(ann.category_id) {
                composition.category_names.insert(name);
                if name == person_category {
                    composition.person_count += 1;
                }
            }
            let area = ann.bbox.area();
            composition.has_small |= area < SMALL_AREA_MAX;
            composition.has_large |= area > MEDIUM_AREA_MAX;
        }

        composition
    }

    pub fn has_scale_diversity(&self) -> bool {
        self.has_small && self.has_large
    }

    pub fn qualifies(&self, opts: &CandidateOptions) -> bool {
        (opts.min_persons..=opts.max_persons).contains(&self.person_count)
            && self.category_names.len() >= opts.min_categories
            && self.object_count >= opts.min_objects
            && self.has_scale_diversity()
    }

    /// Object count plus twice the number of distinct categories.
    pub fn score(&self) -> usize {
        self.object_count + 2 * self.category_names.len()
    }
}

/// A qualifying image with its score.
#[derive(Clone, Debug)]
pub struct Candidate<'a> {
    pub image: &'a Image,
    pub score: usize,
    pub annotations: Vec<&'a Annotation>,
}

/// All qualifying images, best first.
///
/// The sort is stable, so images with equal scores stay in index order (the
/// order in which their first annotation appeared in the input).
pub fn rank_candidates<'a>(
    index: &AnnotationIndex<'a>,
    opts: &CandidateOptions,
) -> Vec<Candidate<'a>> {
    let mut candidates: Vec<Candidate<'a>> = index
        .groups()
        .iter()
        .filter_map(|group| {
            let composition = ImageComposition::of(group, index, &opts.person_category);
            composition.qualifies(opts).then(|| Candidate {
                image: group.image,
                score: composition.score(),
                annotations: group.annotations.clone(),
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    log::info!(
        "{} of {} annotated image(s) qualify as candidates",
        candidates.len(),
        index.groups().len()
    );
    candidates
}

/// The best qualifying image, or `None` when nothing qualifies.
pub fn select_candidate<'a>(
    index: &AnnotationIndex<'a>,
    opts: &CandidateOptions,
) -> Option<Candidate<'a>> {
    let best = rank_candidates(index, opts).into_iter().next();
    if let Some(candidate) = &best {
        log::info!(
            "Selected image {} ({}) with score {}",
            candidate.image.id,
            candidate.image.file_name,
            candidate.score
        );
    }
    best
}

/// Assembles the rendering payload for a selected candidate.
///
/// `keypoint_annotations` is the annotation list of a separate person-keypoint
/// file. Without it the candidate's own annotations are searched for poses.
pub fn build_candidate_report(
    index: &AnnotationIndex<'_>,
    candidate: &Candidate<'_>,
    captions: &[Caption],
    keypoint_annotations: Option<&[Annotation]>,
) -> CandidateReport {
    let image_id = candidate.image.id;

    let objects: Vec<CandidateObject> = candidate
        .annotations
        .iter()
        .map(|ann| CandidateObject::new(ann, index))
        .collect();

    let categories: BTreeSet<String> = objects.iter().map(|o| o.category.clone()).collect();

    let pose: Vec<PoseEntry> = match keypoint_annotations {
        Some(anns) => anns
            .iter()
            .filter(|ann| ann.image_id == image_id)
            .filter_map(PoseEntry::from_annotation)
            .collect(),
        None => candidate
            .annotations
            .iter()
            .copied()
            .filter_map(PoseEntry::from_annotation)
            .collect(),
    };

    CandidateReport {
        meta: CandidateMeta {
            image_id,
            file_name: candidate.image.file_name.clone(),
            score: candidate.score,
            captions: captions
                .iter()
                .filter(|c| c.image_id == image_id)
                .map(|c| c.caption.clone())
                .collect(),
        },
        spatial: objects,
        semantic: SemanticSummary {
            categories: categories.into_iter().collect(),
        },
        pose,
    }
}
