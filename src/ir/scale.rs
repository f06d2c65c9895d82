//! COCO size classes.

use serde::Serialize;
use std::fmt;

/// Upper bound (exclusive) of the small class: 32².
pub const SMALL_AREA_MAX: f64 = 1024.0;

/// Upper bound (inclusive) of the medium class: 96².
pub const MEDIUM_AREA_MAX: f64 = 9216.0;

/// Size class of an object by pixel area.
///
/// `area < 1024` is small, `1024 <= area <= 9216` is medium and anything
/// larger is large. Every pass that reports a scale goes through
/// [`ScaleBucket::from_area`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleBucket {
    Small,
    Medium,
    Large,
}

impl ScaleBucket {
    pub fn from_area(area: f64) -> Self {
        if area < SMALL_AREA_MAX {
            ScaleBucket::Small
        } else if area <= MEDIUM_AREA_MAX {
            ScaleBucket::Medium
        } else {
            ScaleBucket::Large
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleBucket::Small => "small",
            ScaleBucket::Medium => "medium",
            ScaleBucket::Large => "large",
        }
    }
}

impl fmt::Display for ScaleBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-class object counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScaleDistribution {
    pub small: usize,
    pub medium: usize,
    pub large: usize,
}

impl ScaleDistribution {
    pub fn record(&mut self, bucket: ScaleBucket) {
        match bucket {
            ScaleBucket::Small => self.small += 1,
            ScaleBucket::Medium => self.medium += 1,
            ScaleBucket::Large => self.large += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.small + self.medium + self.large
    }

    pub fn merge(&mut self, other: &ScaleDistribution) {
        self.small += other.small;
        self.medium += other.medium;
        self.large += other.large;
    }
}

/// Human-readable thresholds, emitted alongside derived datasets.
#[derive(Clone, Debug, Serialize)]
pub struct ScaleThresholds {
    pub small: &'static str,
    pub medium: &'static str,
    pub large: &'static str,
}

impl Default for ScaleThresholds {
    fn default() -> Self {
        Self {
            small: "< 32x32",
            medium: "32x32 ~ 96x96",
            large: "> 96x96",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_inclusive_on_medium() {
        assert_eq!(ScaleBucket::from_area(1023.9), ScaleBucket::Small);
        assert_eq!(ScaleBucket::from_area(1024.0), ScaleBucket::Medium);
        assert_eq!(ScaleBucket::from_area(9216.0), ScaleBucket::Medium);
        assert_eq!(ScaleBucket::from_area(9216.5), ScaleBucket::Large);
    }

    #[test]
    fn test_distribution_total_and_merge() {
        let mut a = ScaleDistribution::default();
        a.record(ScaleBucket::Small);
        a.record(ScaleBucket::Large);
        let mut b = ScaleDistribution::default();
        b.record(ScaleBucket::Medium);
        a.merge(&b);
        assert_eq!(a.total(), 3);
        assert_eq!((a.small, a.medium, a.large), (1, 1, 1));
    }
}
