//! Person keypoint statistics.
//!
//! A random subset of the keypoint annotations is normalized into its own
//! bounding box, so every pose lives in the unit square regardless of where
//! the person stands in the image. From those normalized poses the pass
//! derives a mean pose, its spread and how often each joint is labeled.

use std::collections::HashMap;
use std::fmt;

use rand::seq::index;
use rand::Rng;
use serde::Serialize;

use crate::error::CocolensError;
use crate::ir::{
    Annotation, AnnotationId, CategoryId, Dataset, Keypoint, ScaleBucket, ScaleDistribution,
};

/// Keypoints per COCO person annotation.
pub const NUM_KEYPOINTS: usize = 17;

#[derive(Clone, Debug)]
pub struct PoseOptions {
    /// Upper bound on the number of annotations examined.
    pub max_samples: usize,
    pub seed: Option<u64>,
}

impl Default for PoseOptions {
    fn default() -> Self {
        Self {
            max_samples: 5000,
            seed: None,
        }
    }
}

pub fn validate_pose_options(opts: &PoseOptions) -> Result<(), CocolensError> {
    if opts.max_samples == 0 {
        return Err(CocolensError::InvalidOptions {
            message: "--max-samples must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// A keypoint in bbox-relative coordinates; `None` when it was not labeled.
pub type NormalizedKeypoint = Option<[f64; 2]>;

/// Maps labeled keypoints into the unit square of `ann.bbox`.
///
/// `None` when the annotation does not carry exactly [`NUM_KEYPOINTS`]
/// keypoints or its bbox has a zero side.
pub fn normalize_pose(ann: &Annotation) -> Option<Vec<NormalizedKeypoint>> {
    let keypoints = ann.keypoints.as_deref()?;
    if keypoints.len() != NUM_KEYPOINTS || ann.bbox.is_degenerate() {
        return None;
    }
    let bbox = ann.bbox;
    Some(
        keypoints
            .iter()
            .map(|kp: &Keypoint| {
                kp.visibility.is_labeled().then(|| {
                    [
                        (kp.x - bbox.x) / bbox.width,
                        (kp.y - bbox.y) / bbox.height,
                    ]
                })
            })
            .collect(),
    )
}

/// Running mean and population variance of one coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Moments {
    n: usize,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn push(&mut self, value: f64) {
        self.n += 1;
        let delta = value - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn std_dev(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            (self.m2 / self.n as f64).sqrt()
        }
    }
}

/// Per-category tally of the kept annotations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoseCategory {
    pub name: String,
    pub count: usize,
    pub scale_distribution: ScaleDistribution,
}

/// One kept annotation, in pixel units.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoseProjection {
    pub id: AnnotationId,
    pub category: String,
    pub cx: f64,
    pub cy: f64,
    pub area: f64,
    pub scale: ScaleBucket,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoseReport {
    pub keypoints: Vec<String>,
    pub skeleton: Vec<[u32; 2]>,
    /// Annotations that passed the keypoint and bbox checks.
    pub total_annotations: usize,
    pub mean_pose: Vec<NormalizedKeypoint>,
    pub std_dev_pose: Vec<NormalizedKeypoint>,
    pub visibility_prob: Vec<f64>,
    pub categories: Vec<PoseCategory>,
    pub annotations: Vec<PoseProjection>,
    /// Examined annotations that were dropped.
    pub skipped: usize,
}

impl fmt::Display for PoseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} pose(s) kept, {} skipped",
            self.total_annotations, self.skipped
        )?;
        for (i, prob) in self.visibility_prob.iter().enumerate() {
            let name = self.keypoints.get(i).map(String::as_str).unwrap_or("?");
            match self.mean_pose.get(i).copied().flatten() {
                Some([x, y]) => writeln!(
                    f,
                    "  {:<16} labeled {:>6}  mean ({:.3}, {:.3})",
                    name,
                    fmt_percent_f(*prob),
                    x,
                    y
                )?,
                None => writeln!(f, "  {:<16} never labeled", name)?,
            }
        }
        Ok(())
    }
}

fn fmt_percent_f(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

/// Accumulates normalized poses.
#[derive(Clone, Debug)]
pub struct PoseAggregator {
    x: [Moments; NUM_KEYPOINTS],
    y: [Moments; NUM_KEYPOINTS],
    labeled: [usize; NUM_KEYPOINTS],
    kept: usize,
    skipped: usize,
    categories: Vec<PoseCategory>,
    annotations: Vec<PoseProjection>,
}

impl Default for PoseAggregator {
    fn default() -> Self {
        Self {
            x: [Moments::default(); NUM_KEYPOINTS],
            y: [Moments::default(); NUM_KEYPOINTS],
            labeled: [0; NUM_KEYPOINTS],
            kept: 0,
            skipped: 0,
            categories: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

impl PoseAggregator {
    /// Adds one annotation. Returns false when it was skipped.
    pub fn accumulate(&mut self, ann: &Annotation, category: &str) -> bool {
        let Some(pose) = normalize_pose(ann) else {
            log::debug!("Annotation {} skipped: no usable 17-point pose", ann.id);
            self.skipped += 1;
            return false;
        };

        for (i, point) in pose.iter().enumerate() {
            if let Some([x, y]) = *point {
                self.x[i].push(x);
                self.y[i].push(y);
                self.labeled[i] += 1;
            }
        }
        self.kept += 1;

        let area = ann.bbox.area();
        let scale = ScaleBucket::from_area(area);
        let pos = match self.categories.iter().position(|c| c.name == category) {
            Some(pos) => pos,
            None => {
                self.categories.push(PoseCategory {
                    name: category.to_string(),
                    count: 0,
                    scale_distribution: ScaleDistribution::default(),
                });
                self.categories.len() - 1
            }
        };
        self.categories[pos].count += 1;
        self.categories[pos].scale_distribution.record(scale);

        let center = ann.bbox.center();
        self.annotations.push(PoseProjection {
            id: ann.id,
            category: category.to_string(),
            cx: center.x,
            cy: center.y,
            area,
            scale,
        });
        true
    }

    pub fn finish(self, keypoints: Vec<String>, skeleton: Vec<[u32; 2]>) -> PoseReport {
        let mean_pose = (0..NUM_KEYPOINTS)
            .map(|i| (self.labeled[i] > 0).then(|| [self.x[i].mean, self.y[i].mean]))
            .collect();
        let std_dev_pose = (0..NUM_KEYPOINTS)
            .map(|i| {
                (self.labeled[i] > 0).then(|| [self.x[i].std_dev(), self.y[i].std_dev()])
            })
            .collect();
        let visibility_prob = self
            .labeled
            .iter()
            .map(|&n| {
                if self.kept == 0 {
                    0.0
                } else {
                    n as f64 / self.kept as f64
                }
            })
            .collect();

        let mut categories = self.categories;
        categories.sort_by(|a, b| b.count.cmp(&a.count));

        PoseReport {
            keypoints,
            skeleton,
            total_annotations: self.kept,
            mean_pose,
            std_dev_pose,
            visibility_prob,
            categories,
            annotations: self.annotations,
            skipped: self.skipped,
        }
    }
}

/// Runs the pose pass over up to `opts.max_samples` randomly chosen
/// annotations of `dataset`.
///
/// With no more annotations than the limit, all of them are examined in
/// input order and `rng` is not used.
pub fn aggregate_poses<R: Rng + ?Sized>(
    dataset: &Dataset,
    opts: &PoseOptions,
    rng: &mut R,
) -> Result<PoseReport, CocolensError> {
    validate_pose_options(opts)?;

    let mut names: HashMap<CategoryId, &str> = HashMap::new();
    for category in &dataset.categories {
        names.entry(category.id).or_insert(category.name.as_str());
    }

    let all = &dataset.annotations;
    let picked: Vec<&Annotation> = if all.len() <= opts.max_samples {
        all.iter().collect()
    } else {
        index::sample(rng, all.len(), opts.max_samples)
            .iter()
            .map(|i| &all[i])
            .collect()
    };

    let mut aggregator = PoseAggregator::default();
    for ann in &picked {
        let category = names.get(&ann.category_id).copied().unwrap_or("unknown");
        aggregator.accumulate(ann, category);
    }

    let (keypoints, skeleton) = dataset
        .categories
        .iter()
        .find(|c| c.name == "person")
        .map(|c| (c.keypoints.clone(), c.skeleton.clone()))
        .unwrap_or_default();
    if keypoints.is_empty() {
        log::warn!("No 'person' category with keypoint names; pose output has no names");
    }

    let report = aggregator.finish(keypoints, skeleton);
    log::info!(
        "Pose pass kept {} of {} examined annotation(s) ({} in dataset)",
        report.total_annotations,
        picked.len(),
        all.len()
    );
    Ok(report)
}
