//! Log-scale size histograms.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::CocolensError;
use crate::stats::report::round_to;
use crate::stats::StatAggregator;

/// Floor applied before taking log10, so zero areas stay finite.
pub const LOG_EPSILON: f64 = 1e-8;

/// Decimal places kept for bucket centers.
const CENTER_PLACES: i32 = 4;

/// Options for [`CategoryHistograms::build`].
#[derive(Clone, Debug)]
pub struct HistogramOptions {
    pub bins: usize,
    /// How many of the most frequent categories get a histogram.
    pub top_categories: usize,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            bins: 30,
            top_categories: 20,
        }
    }
}

/// Largest accepted bin count.
pub const MAX_BINS: usize = 10_000;

pub fn validate_histogram_options(opts: &HistogramOptions) -> Result<(), CocolensError> {
    if opts.bins == 0 {
        return Err(CocolensError::InvalidOptions {
            message: "histogram bins must be greater than 0".to_string(),
        });
    }
    if opts.bins > MAX_BINS {
        return Err(CocolensError::InvalidOptions {
            message: format!("histogram bins {} exceed the maximum of {MAX_BINS}", opts.bins),
        });
    }
    Ok(())
}

/// One non-empty bucket: its center in log10 space and how many values fell
/// in it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub x: f64,
    pub count: usize,
}

/// Buckets `values` on a log10 axis into `bins` equal-width bins and returns
/// the non-empty ones in ascending order.
///
/// Every value lands in exactly one bucket. Bucket centers are rounded to
/// four places. When all transformed values are equal the result is a single
/// bucket at that value, unrounded. Empty input or zero bins give an empty
/// histogram.
pub fn build_histogram(values: &[f64], bins: usize) -> Vec<HistogramBucket> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let logs: Vec<f64> = values
        .iter()
        .map(|&v| v.max(LOG_EPSILON).log10())
        .collect();
    let min = logs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return vec![HistogramBucket {
            x: min,
            count: logs.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in logs {
        let slot = ((v - min) / width).floor();
        let slot = if slot.is_finite() && slot > 0.0 {
            (slot as usize).min(bins - 1)
        } else {
            0
        };
        counts[slot] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .filter(|(_, count)| *count > 0)
        .map(|(i, count)| HistogramBucket {
            x: round_to(min + (i as f64 + 0.5) * width, CENTER_PLACES),
            count,
        })
        .collect()
}

/// Relative-area histograms of the most frequent categories, in count order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryHistograms {
    pub entries: Vec<(String, Vec<HistogramBucket>)>,
}

impl CategoryHistograms {
    pub fn build(stats: &StatAggregator<'_>, opts: &HistogramOptions) -> Result<Self, CocolensError> {
        validate_histogram_options(opts)?;
        let entries: Vec<_> = stats
            .ranked()
            .into_iter()
            .take(opts.top_categories)
            .map(|(category, cat_stats)| {
                (category.name.clone(), build_histogram(&cat_stats.areas, opts.bins))
            })
            .collect();
        log::debug!("Built {} size histogram(s) with {} bins", entries.len(), opts.bins);
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&[HistogramBucket]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, buckets)| buckets.as_slice())
    }
}

impl Serialize for CategoryHistograms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, buckets) in &self.entries {
            map.serialize_entry(name, buckets)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::AnnotationIndex;
    use crate::ir::{Annotation, BBox, Category, Dataset, Image};

    #[test]
    fn test_spread_values_split_into_buckets() {
        let buckets = build_histogram(&[900.0, 900.0, 10000.0], 30);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].count, 1);

        // log10(900) = 2.954243, width = 0.045757 / 30
        assert_eq!(buckets[0].x, 2.9717);
        assert_eq!(buckets[1].x, 3.9826);
    }

    #[test]
    fn test_equal_values_give_one_bucket() {
        let buckets = build_histogram(&[900.0, 900.0], 30);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].x, 900f64.log10());
    }

    #[test]
    fn test_zero_is_floored() {
        let buckets = build_histogram(&[0.0, 1.0], 2);
        assert_eq!(buckets.len(), 2);
        assert!((buckets[0].x - (-6.0)).abs() < 1e-9);
        assert_eq!(buckets[1].count, 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_histogram(&[], 30).is_empty());
        assert!(build_histogram(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_category_histograms_follow_count_order() {
        let dataset = Dataset {
            categories: vec![Category::new(1u64, "cup"), Category::new(2u64, "fork")],
            images: vec![Image::new(1u64, "a.jpg", 100, 100)],
            annotations: vec![
                Annotation::new(1u64, 1u64, 1u64, BBox::from_xywh(0.0, 0.0, 10.0, 10.0)),
                Annotation::new(2u64, 1u64, 2u64, BBox::from_xywh(0.0, 0.0, 10.0, 10.0)),
                Annotation::new(3u64, 1u64, 2u64, BBox::from_xywh(0.0, 0.0, 20.0, 20.0)),
            ],
        };
        let index = AnnotationIndex::build(&dataset);
        let stats = StatAggregator::run(&index);

        let all = CategoryHistograms::build(&stats, &HistogramOptions::default()).expect("ok");
        let names: Vec<&str> = all.entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["fork", "cup"]);
        assert_eq!(all.get("cup").map(|b| b.len()), Some(1));

        let top = CategoryHistograms::build(
            &stats,
            &HistogramOptions {
                bins: 5,
                top_categories: 1,
            },
        )
        .expect("ok");
        assert_eq!(top.entries.len(), 1);
        assert!(top.get("cup").is_none());
    }

    #[test]
    fn test_zero_bins_rejected_at_the_pass() {
        let dataset = Dataset::default();
        let index = AnnotationIndex::build(&dataset);
        let stats = StatAggregator::run(&index);
        let opts = HistogramOptions {
            bins: 0,
            top_categories: 1,
        };
        assert!(CategoryHistograms::build(&stats, &opts).is_err());
    }

    #[test]
    fn test_oversized_bins_rejected() {
        let dataset = Dataset::default();
        let index = AnnotationIndex::build(&dataset);
        let stats = StatAggregator::run(&index);
        for bins in [MAX_BINS + 1, usize::MAX] {
            let opts = HistogramOptions {
                bins,
                top_categories: 1,
            };
            assert!(matches!(
                CategoryHistograms::build(&stats, &opts),
                Err(CocolensError::InvalidOptions { .. })
            ));
        }
        let largest = HistogramOptions {
            bins: MAX_BINS,
            top_categories: 1,
        };
        assert!(validate_histogram_options(&largest).is_ok());
    }
}
