//! Lookup structure shared by every pass.
//!
//! The index resolves category and image ids and groups annotations by the
//! image that owns them. Annotations pointing at an unknown category or image
//! are skipped and counted here, once, so downstream passes only ever see
//! resolvable records.

use std::collections::HashMap;

use serde::Serialize;

use crate::ir::{Annotation, Category, CategoryId, Dataset, Image, ImageId};

/// Records dropped while building the index because a reference did not
/// resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub missing_category: usize,
    pub missing_image: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.missing_category + self.missing_image
    }
}

/// One image and its annotations, in input order.
#[derive(Clone, Debug)]
pub struct ImageGroup<'a> {
    pub image: &'a Image,
    pub annotations: Vec<&'a Annotation>,
}

/// Read-only index over a [`Dataset`].
#[derive(Debug)]
pub struct AnnotationIndex<'a> {
    categories: Vec<&'a Category>,
    category_pos: HashMap<CategoryId, usize>,
    images: HashMap<ImageId, &'a Image>,
    groups: Vec<ImageGroup<'a>>,
    group_pos: HashMap<ImageId, usize>,
    records: Vec<&'a Annotation>,
    skipped: SkipCounts,
}

impl<'a> AnnotationIndex<'a> {
    /// Builds the index in one pass over the annotations.
    ///
    /// Image groups are ordered by the first annotation that mentions each
    /// image. Images without annotations get no group. When ids repeat, the
    /// first category or image record wins.
    pub fn build(dataset: &'a Dataset) -> Self {
        let mut categories = Vec::with_capacity(dataset.categories.len());
        let mut category_pos = HashMap::with_capacity(dataset.categories.len());
        for category in &dataset.categories {
            if !category_pos.contains_key(&category.id) {
                category_pos.insert(category.id, categories.len());
                categories.push(category);
            }
        }

        let mut images = HashMap::with_capacity(dataset.images.len());
        for image in &dataset.images {
            images.entry(image.id).or_insert(image);
        }

        let mut groups: Vec<ImageGroup<'a>> = Vec::new();
        let mut group_pos: HashMap<ImageId, usize> = HashMap::new();
        let mut records = Vec::with_capacity(dataset.annotations.len());
        let mut skipped = SkipCounts::default();

        for ann in &dataset.annotations {
            if !category_pos.contains_key(&ann.category_id) {
                log::debug!(
                    "Annotation {} references unknown category {}",
                    ann.id,
                    ann.category_id
                );
                skipped.missing_category += 1;
                continue;
            }
            let Some(&image) = images.get(&ann.image_id) else {
                log::debug!(
                    "Annotation {} references unknown image {}",
                    ann.id,
                    ann.image_id
                );
                skipped.missing_image += 1;
                continue;
            };

            let pos = *group_pos.entry(ann.image_id).or_insert_with(|| {
                groups.push(ImageGroup {
                    image,
                    annotations: Vec::new(),
                });
                groups.len() - 1
            });
            groups[pos].annotations.push(ann);
            records.push(ann);
        }

        if skipped.total() > 0 {
            log::warn!(
                "Skipped {} annotation(s): {} with unknown category, {} with unknown image",
                skipped.total(),
                skipped.missing_category,
                skipped.missing_image
            );
        }
        log::info!(
            "Indexed {} annotation(s) across {} image(s) and {} categories",
            records.len(),
            groups.len(),
            categories.len()
        );

        Self {
            categories,
            category_pos,
            images,
            groups,
            group_pos,
            records,
            skipped,
        }
    }

    /// Categories in dataset order, duplicates removed.
    pub fn categories(&self) -> &[&'a Category] {
        &self.categories
    }

    pub fn category(&self, id: CategoryId) -> Option<&'a Category> {
        self.category_pos.get(&id).map(|&pos| self.categories[pos])
    }

    pub fn category_name(&self, id: CategoryId) -> Option<&'a str> {
        self.category(id).map(|c| c.name.as_str())
    }

    pub fn image(&self, id: ImageId) -> Option<&'a Image> {
        self.images.get(&id).copied()
    }

    /// Annotated images in first-appearance order.
    pub fn groups(&self) -> &[ImageGroup<'a>] {
        &self.groups
    }

    /// Annotations of one image; empty when the image has none.
    pub fn annotations_for(&self, image_id: ImageId) -> &[&'a Annotation] {
        self.group_pos
            .get(&image_id)
            .map(|&pos| self.groups[pos].annotations.as_slice())
            .unwrap_or(&[])
    }

    /// Every resolvable annotation, in input order.
    pub fn records(&self) -> &[&'a Annotation] {
        &self.records
    }

    pub fn skipped(&self) -> SkipCounts {
        self.skipped
    }
}
