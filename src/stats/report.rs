//! Category summary types and terminal formatting.

use serde::Serialize;
use std::fmt;

use super::CategoryStats;
use crate::ir::{Category, CategoryId, ScaleDistribution};

/// Summary of the relative-area sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AreaStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// `sorted[n / 2]`, no interpolation.
    pub median: f64,
}

/// Decimal places kept for relative-area values.
pub(crate) const AREA_PLACES: i32 = 6;
/// Decimal places kept for aspect ratios.
pub(crate) const RATIO_PLACES: i32 = 3;

impl AreaStats {
    /// `None` for an empty sample. Values are rounded to six places.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let (mean, min, max) = mean_min_max(samples)?;
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            mean: round_to(mean, AREA_PLACES),
            min: round_to(min, AREA_PLACES),
            max: round_to(max, AREA_PLACES),
            median: round_to(sorted[sorted.len() / 2], AREA_PLACES),
        })
    }
}

/// Summary of the aspect-ratio sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AspectRatioStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl AspectRatioStats {
    /// Rounded to three places.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let (mean, min, max) = mean_min_max(samples)?;
        Some(Self {
            mean: round_to(mean, RATIO_PLACES),
            min: round_to(min, RATIO_PLACES),
            max: round_to(max, RATIO_PLACES),
        })
    }
}

fn mean_min_max(samples: &[f64]) -> Option<(f64, f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in samples {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    Some((sum / samples.len() as f64, min, max))
}

/// One row of the category statistics output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: String,
    pub count: usize,
    pub area_stats: AreaStats,
    pub aspect_ratio_stats: AspectRatioStats,
    pub scale_distribution: ScaleDistribution,
}

impl CategorySummary {
    /// `None` when the category collected no samples.
    pub fn from_stats(category: &Category, stats: &CategoryStats<'_>) -> Option<Self> {
        Some(Self {
            id: category.id,
            name: category.name.clone(),
            supercategory: category.supercategory_or_fallback().to_string(),
            count: stats.count,
            area_stats: AreaStats::from_samples(&stats.areas)?,
            aspect_ratio_stats: AspectRatioStats::from_samples(&stats.aspect_ratios)?,
            scale_distribution: stats.scale_distribution,
        })
    }
}

/// Count-ordered category summaries.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategoryTable {
    pub rows: Vec<CategorySummary>,
}

impl CategoryTable {
    pub fn total(&self) -> usize {
        self.rows.iter().map(|row| row.count).sum()
    }
}

const BAR_WIDTH: usize = 24;
const LABEL_WIDTH: usize = 18;

impl fmt::Display for CategoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        let max_count = self.rows.first().map(|row| row.count).unwrap_or(0);
        writeln!(
            f,
            "{} categories, {} annotation(s)",
            self.rows.len(),
            format_number(total)
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "  {:<width$} {}{:>9} {:>6}  S/M/L {}/{}/{}  median area {:.4}",
                truncate_label(&row.name, LABEL_WIDTH),
                pad_bar(&render_bar(row.count, max_count, BAR_WIDTH), BAR_WIDTH),
                format_number(row.count),
                fmt_percent(row.count, total),
                row.scale_distribution.small,
                row.scale_distribution.medium,
                row.scale_distribution.large,
                row.area_stats.median,
                width = LABEL_WIDTH
            )?;
        }
        Ok(())
    }
}

/// Format a number with thousands separators.
/// Rounds half away from zero to `places` decimals.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub(crate) fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a share as a percentage; "n/a" for an empty whole.
pub(crate) fn fmt_percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", part as f64 / whole as f64 * 100.0)
    }
}

/// Horizontal bar scaled against `max_count`.
pub(crate) fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return String::new();
    }
    let filled = (count * width / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

fn pad_bar(bar: &str, width: usize) -> String {
    let padding = (width + 2).saturating_sub(bar.chars().count());
    format!("{}{}", bar, " ".repeat(padding))
}

/// Shorten a label to `max_chars` characters, marking the cut with "…".
pub(crate) fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let kept: String = label.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_is_positional() {
        let stats = AreaStats::from_samples(&[4.0, 1.0, 3.0, 2.0]).expect("non-empty");
        // sorted = [1, 2, 3, 4]; index 2, not the interpolated 2.5
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.5);

        let odd = AreaStats::from_samples(&[5.0, 1.0, 3.0]).expect("non-empty");
        assert_eq!(odd.median, 3.0);
    }

    #[test]
    fn test_summaries_are_rounded() {
        // a 1x1 box in a 7x3 image
        let area = AreaStats::from_samples(&[1.0 / 21.0]).expect("non-empty");
        assert_eq!(area.median, 0.047619);
        assert_eq!(area.mean, 0.047619);

        let ratio = AspectRatioStats::from_samples(&[2.0 / 3.0, 1.0]).expect("non-empty");
        assert_eq!(ratio.min, 0.667);
        assert_eq!(ratio.mean, 0.833);
        assert_eq!(ratio.max, 1.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.9716718009486693, 4), 2.9717);
        assert_eq!(round_to(-1.23456, 2), -1.23);
        assert_eq!(round_to(3.0, 6), 3.0);
    }

    #[test]
    fn test_empty_samples_have_no_summary() {
        assert!(AreaStats::from_samples(&[]).is_none());
        assert!(AspectRatioStats::from_samples(&[]).is_none());
    }

    #[test]
    fn test_supercategory_fallback() {
        let category = Category::new(7u64, "thing");
        let stats = CategoryStats {
            count: 1,
            areas: vec![0.5],
            aspect_ratios: vec![1.0],
            ..Default::default()
        };
        let summary = CategorySummary::from_stats(&category, &stats).expect("summary");
        assert_eq!(summary.supercategory, "other");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_fmt_percent() {
        assert_eq!(fmt_percent(1, 4), "25.0%");
        assert_eq!(fmt_percent(1, 0), "n/a");
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(5, 10, 4), "██░░");
        assert_eq!(render_bar(1, 0, 4), "");
    }

    #[test]
    fn test_truncate_label_counts_chars() {
        assert_eq!(truncate_label("dog", 5), "dog");
        assert_eq!(truncate_label("motorcycle", 5), "moto…");
        assert_eq!(truncate_label("çççççç", 3), "çç…");
    }
}
