//! Quota-balanced stratified sampling.
//!
//! Each non-empty category first gets up to `max(budget / categories,
//! floor_min)` records drawn uniformly without replacement. If the union
//! is still short of the budget, the remainder is drawn from every record
//! not yet selected, regardless of category. The result is cut to the budget.
//!
//! The backfill can tilt the sample towards large categories when counts are
//! very uneven; that is the intended behavior.

use rand::seq::index;
use rand::Rng;

use crate::error::CocolensError;
use crate::ir::Annotation;
use crate::stats::StatAggregator;

/// Sampling options.
#[derive(Clone, Debug)]
pub struct SampleOptions {
    /// Upper bound on the sample size.
    pub budget: usize,
    /// Lower bound on each category's quota.
    pub floor_min: usize,
    /// Seed for a reproducible draw. Callers without one use the thread RNG.
    pub seed: Option<u64>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            budget: 8000,
            floor_min: 50,
            seed: None,
        }
    }
}

/// Validate sampling options before running.
pub fn validate_sample_options(opts: &SampleOptions) -> Result<(), CocolensError> {
    if opts.budget == 0 {
        return Err(CocolensError::InvalidOptions {
            message: "sample budget must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Per-category quota for `non_empty` categories.
pub fn category_quota(budget: usize, floor_min: usize, non_empty: usize) -> usize {
    if non_empty == 0 {
        return floor_min;
    }
    (budget / non_empty).max(floor_min)
}

/// Draws a stratified sample of at most `opts.budget` records from `groups`.
///
/// When the groups hold no more than the budget in total, every record is
/// returned in grouping order and `rng` is left untouched.
pub fn stratified_sample<'a, R: Rng + ?Sized>(
    groups: &[&[&'a Annotation]],
    opts: &SampleOptions,
    rng: &mut R,
) -> Result<Vec<&'a Annotation>, CocolensError> {
    validate_sample_options(opts)?;

    let total: usize = groups.iter().map(|g| g.len()).sum();
    if total <= opts.budget {
        log::info!("Sample keeps all {} record(s)", total);
        return Ok(groups.iter().flat_map(|g| g.iter().copied()).collect());
    }

    let non_empty = groups.iter().filter(|g| !g.is_empty()).count();
    let quota = category_quota(opts.budget, opts.floor_min, non_empty);

    let mut sampled = Vec::with_capacity(opts.budget);
    let mut taken: Vec<Vec<bool>> = groups.iter().map(|g| vec![false; g.len()]).collect();
    for (group, taken) in groups.iter().zip(taken.iter_mut()) {
        let amount = quota.min(group.len());
        for i in index::sample(rng, group.len(), amount).iter() {
            taken[i] = true;
            sampled.push(group[i]);
        }
    }
    let from_quotas = sampled.len();

    if sampled.len() < opts.budget {
        let pool: Vec<&'a Annotation> = groups
            .iter()
            .zip(&taken)
            .flat_map(|(group, taken)| {
                group
                    .iter()
                    .zip(taken)
                    .filter(|(_, was_taken)| !**was_taken)
                    .map(|(&ann, _)| ann)
            })
            .collect();
        let extra = (opts.budget - sampled.len()).min(pool.len());
        for i in index::sample(rng, pool.len(), extra).iter() {
            sampled.push(pool[i]);
        }
    }

    sampled.truncate(opts.budget);
    log::info!(
        "Sampled {} of {} record(s): quota {} over {} categories, {} from backfill",
        sampled.len(),
        total,
        quota,
        non_empty,
        sampled.len().saturating_sub(from_quotas)
    );
    Ok(sampled)
}

/// Samples from the per-category record lists of `stats`, in index order.
pub fn sample_categories<'a, R: Rng + ?Sized>(
    stats: &StatAggregator<'a>,
    opts: &SampleOptions,
    rng: &mut R,
) -> Result<Vec<&'a Annotation>, CocolensError> {
    let groups: Vec<&[&'a Annotation]> = stats
        .entries()
        .iter()
        .map(|(_, cat_stats)| cat_stats.records.as_slice())
        .collect();
    stratified_sample(&groups, opts, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BBox;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn records(category: u64, first_id: u64, n: usize) -> Vec<Annotation> {
        (0..n as u64)
            .map(|i| {
                Annotation::new(
                    first_id + i,
                    1u64,
                    category,
                    BBox::from_xywh(0.0, 0.0, 1.0, 1.0),
                )
            })
            .collect()
    }

    fn opts(budget: usize, floor_min: usize) -> SampleOptions {
        SampleOptions {
            budget,
            floor_min,
            seed: None,
        }
    }

    #[test]
    fn test_under_budget_returns_everything_in_order() {
        let a = records(1, 0, 3);
        let b = records(2, 100, 2);
        let a_refs: Vec<&Annotation> = a.iter().collect();
        let b_refs: Vec<&Annotation> = b.iter().collect();
        let mut rng = StdRng::seed_from_u64(1);

        let groups = [a_refs.as_slice(), b_refs.as_slice()];
        let sample = stratified_sample(&groups, &opts(5, 50), &mut rng).expect("ok");
        let ids: Vec<u64> = sample.iter().map(|a| a.id.as_u64()).collect();
        assert_eq!(ids, vec![0, 1, 2, 100, 101]);
    }

    #[test]
    fn test_quota_is_floored() {
        assert_eq!(category_quota(8000, 50, 80), 100);
        assert_eq!(category_quota(8000, 50, 400), 50);
        assert_eq!(category_quota(10, 2, 0), 2);
    }

    #[test]
    fn test_backfill_fills_budget_without_duplicates() {
        // quota = max(20 / 2, 1) = 10; the small category only has 3, so
        // backfill supplies the missing 7 from the big one.
        let big = records(1, 0, 100);
        let small = records(2, 1000, 3);
        let big_refs: Vec<&Annotation> = big.iter().collect();
        let small_refs: Vec<&Annotation> = small.iter().collect();
        let mut rng = StdRng::seed_from_u64(7);

        let groups = [big_refs.as_slice(), small_refs.as_slice()];
        let sample = stratified_sample(&groups, &opts(20, 1), &mut rng).expect("ok");
        assert_eq!(sample.len(), 20);
        let unique: HashSet<u64> = sample.iter().map(|a| a.id.as_u64()).collect();
        assert_eq!(unique.len(), 20);
        assert_eq!(sample.iter().filter(|a| a.id.as_u64() >= 1000).count(), 3);
    }

    #[test]
    fn test_quotas_over_budget_are_truncated() {
        // quota floors at 5 for each of 4 categories = 20 > budget 10
        let groups: Vec<Vec<Annotation>> =
            (0..4).map(|c| records(c + 1, c * 100, 10)).collect();
        let refs: Vec<Vec<&Annotation>> = groups.iter().map(|g| g.iter().collect()).collect();
        let slices: Vec<&[&Annotation]> = refs.iter().map(|r| r.as_slice()).collect();
        let mut rng = StdRng::seed_from_u64(3);

        let sample = stratified_sample(&slices, &opts(10, 5), &mut rng).expect("ok");
        assert_eq!(sample.len(), 10);
    }

    #[test]
    fn test_same_seed_same_sample() {
        let big = records(1, 0, 200);
        let refs: Vec<&Annotation> = big.iter().collect();

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            stratified_sample(&[refs.as_slice()], &opts(25, 1), &mut rng)
                .expect("ok")
                .iter()
                .map(|a| a.id.as_u64())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }

    #[test]
    fn test_empty_input_and_zero_budget() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(stratified_sample(&[], &opts(10, 1), &mut rng)
            .expect("ok")
            .is_empty());
        assert!(matches!(
            stratified_sample(&[], &opts(0, 1), &mut rng),
            Err(CocolensError::InvalidOptions { .. })
        ));
    }
}
