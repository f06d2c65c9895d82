#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use cocolens::ir::{Annotation, BBox, Category, CategoryId, Dataset, Image, ImageId};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

#[derive(Clone, Debug)]
struct AnnSeed {
    category: usize,
    image: usize,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    supplied_area: Option<u32>,
}

fn ann_seed_strategy(categories: usize, images: usize) -> impl Strategy<Value = AnnSeed> {
    // One index past the end on each side produces a dangling reference.
    (
        0..=categories,
        0..=images,
        0u32..800,
        0u32..600,
        0u32..300,
        0u32..300,
        proptest::option::of(0u32..40_000),
    )
        .prop_map(|(category, image, x, y, w, h, supplied_area)| AnnSeed {
            category,
            image,
            x,
            y,
            w,
            h,
            supplied_area,
        })
}

fn image_dims_strategy() -> BoxedStrategy<(u32, u32)> {
    prop_oneof![
        9 => (1u32..=1280, 1u32..=960),
        1 => prop_oneof![Just((0u32, 480u32)), Just((640u32, 0u32))],
    ]
    .boxed()
}

/// Datasets with up to the given number of categories, images and
/// annotations. A few images have a zero side and a few annotations point at
/// ids that do not exist.
pub fn arb_dataset(
    max_categories: usize,
    max_images: usize,
    max_annotations: usize,
) -> BoxedStrategy<Dataset> {
    (1..=max_categories, 1..=max_images)
        .prop_flat_map(move |(n_categories, n_images)| {
            (
                Just(n_categories),
                proptest::collection::vec(image_dims_strategy(), n_images),
                proptest::collection::vec(
                    ann_seed_strategy(n_categories, n_images),
                    0..=max_annotations,
                ),
            )
        })
        .prop_map(|(n_categories, dims, seeds)| build_dataset(n_categories, &dims, &seeds))
        .boxed()
}

fn build_dataset(n_categories: usize, dims: &[(u32, u32)], seeds: &[AnnSeed]) -> Dataset {
    let categories = (0..n_categories)
        .map(|i| Category::new(i as u64 + 1, format!("cat{i}")))
        .collect();
    let images = dims
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| Image::new(i as u64 + 1, format!("img{i}.jpg"), w, h))
        .collect();
    let annotations = seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            let ann = Annotation::new(
                i as u64 + 1,
                seed.image as u64 + 1,
                seed.category as u64 + 1,
                BBox::from_xywh(seed.x as f64, seed.y as f64, seed.w as f64, seed.h as f64),
            );
            match seed.supplied_area {
                Some(area) => ann.with_area(area as f64),
                None => ann,
            }
        })
        .collect();

    Dataset {
        categories,
        images,
        annotations,
    }
}

/// Number of distinct images each category appears in, counting only
/// annotations whose category and image both resolve.
pub fn images_per_category(dataset: &Dataset) -> BTreeMap<CategoryId, usize> {
    let known_categories: BTreeSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();
    let known_images: BTreeSet<ImageId> = dataset.images.iter().map(|i| i.id).collect();

    let mut seen: BTreeSet<(CategoryId, ImageId)> = BTreeSet::new();
    for ann in &dataset.annotations {
        if known_categories.contains(&ann.category_id) && known_images.contains(&ann.image_id) {
            seen.insert((ann.category_id, ann.image_id));
        }
    }

    let mut counts = BTreeMap::new();
    for (category, _) in seen {
        *counts.entry(category).or_insert(0) += 1;
    }
    counts
}
