//! Aggregation: reduce raw trials to one row per grouping key.
//!
//! Grouping is by exact key equality (no binning), and output order is
//! ascending by key tuple so downstream joins and tests are reproducible.

use std::collections::BTreeMap;

use crate::error::AggregateError;
use crate::record::{BulkExactTrial, BulkHllTrial, ExactTrial, HashingTrial, UnionTrial};

/// Aggregated sketch-union trials for one (precision, num_days) key.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionGroup {
    pub precision: u32,
    pub num_days: u32,
    pub avg_estimate: f64,
    pub union_time_ms: f64,
    pub union_stddev_ms: f64,
    pub avg_sketch_bytes: f64,
    pub trials: usize,
}

/// Aggregated exact-count trials for one num_days key.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactGroup {
    pub num_days: u32,
    pub exact_count: f64,
    pub exact_time_ms: f64,
    pub exact_stddev_ms: f64,
    pub trials: usize,
}

/// Mean bulk-aggregation duration for one test case. The exact baseline
/// carries no error figure; HLL variants report their mean relative error.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkGroup {
    pub test_name: String,
    pub duration_ms: f64,
    pub relative_error_pct: Option<f64>,
    pub trials: usize,
}

/// Mean overhead for one hash function.
#[derive(Debug, Clone, PartialEq)]
pub struct HashingGroup {
    pub test_name: String,
    pub duration_ms: f64,
    pub trials: usize,
}

/// Group items by an exact key, ascending by key. Every returned group is
/// non-empty. Fails on an empty input so callers can decide whether a
/// missing measurement set is fatal.
pub fn group_sorted<T, K, F>(items: &[T], key: F) -> Result<Vec<(K, Vec<&T>)>, AggregateError>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    if items.is_empty() {
        return Err(AggregateError::EmptyInput);
    }
    let mut groups: BTreeMap<K, Vec<&T>> = BTreeMap::new();
    for item in items {
        groups.entry(key(item)).or_default().push(item);
    }
    Ok(groups.into_iter().collect())
}

/// Arithmetic mean. Callers pass non-empty slices (groups are non-empty).
pub fn mean(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator).
///
/// A single-member group yields 0.0, not NaN. "No spread observed" is the
/// useful answer for a lone trial, and 0 is observably different from
/// undefined for every consumer of the aggregated table.
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Aggregate union trials by (precision, num_days).
pub fn aggregate_union(trials: &[UnionTrial]) -> Result<Vec<UnionGroup>, AggregateError> {
    let groups = group_sorted(trials, |t| (t.precision, t.num_days))?;
    Ok(groups
        .into_iter()
        .map(|((precision, num_days), members)| {
            let times: Vec<f64> = members.iter().map(|t| t.query_time_ms).collect();
            let estimates: Vec<f64> = members.iter().map(|t| t.estimated_count).collect();
            let sizes: Vec<f64> = members
                .iter()
                .map(|t| t.total_sketch_size_bytes as f64)
                .collect();
            UnionGroup {
                precision,
                num_days,
                avg_estimate: mean(&estimates),
                union_time_ms: mean(&times),
                union_stddev_ms: sample_stddev(&times),
                avg_sketch_bytes: mean(&sizes),
                trials: members.len(),
            }
        })
        .collect())
}

/// Aggregate exact trials by num_days.
pub fn aggregate_exact(trials: &[ExactTrial]) -> Result<Vec<ExactGroup>, AggregateError> {
    let groups = group_sorted(trials, |t| t.num_days)?;
    Ok(groups
        .into_iter()
        .map(|(num_days, members)| {
            let times: Vec<f64> = members.iter().map(|t| t.query_time_ms).collect();
            let counts: Vec<f64> = members.iter().map(|t| t.exact_count).collect();
            ExactGroup {
                num_days,
                exact_count: mean(&counts),
                exact_time_ms: mean(&times),
                exact_stddev_ms: sample_stddev(&times),
                trials: members.len(),
            }
        })
        .collect())
}

/// Name given to the exact baseline row in the bulk comparison.
pub const BULK_EXACT_NAME: &str = "exact_count";

/// Aggregate bulk trials: one exact-baseline row first, then one row per
/// HLL test case, ascending by name. Both sides must be non-empty.
pub fn aggregate_bulk(
    exact: &[BulkExactTrial],
    hll: &[BulkHllTrial],
) -> Result<Vec<BulkGroup>, AggregateError> {
    if exact.is_empty() {
        return Err(AggregateError::EmptyInput);
    }
    let exact_times: Vec<f64> = exact.iter().map(|t| t.duration_ms).collect();
    let mut groups = vec![BulkGroup {
        test_name: BULK_EXACT_NAME.to_string(),
        duration_ms: mean(&exact_times),
        relative_error_pct: None,
        trials: exact.len(),
    }];
    for (test_name, members) in group_sorted(hll, |t| t.test_name.clone())? {
        let times: Vec<f64> = members.iter().map(|t| t.duration_ms).collect();
        let errors: Vec<f64> = members.iter().map(|t| t.relative_error).collect();
        groups.push(BulkGroup {
            test_name,
            duration_ms: mean(&times),
            relative_error_pct: Some(mean(&errors)),
            trials: members.len(),
        });
    }
    Ok(groups)
}

/// Aggregate hashing trials by hash function name.
pub fn aggregate_hashing(trials: &[HashingTrial]) -> Result<Vec<HashingGroup>, AggregateError> {
    Ok(group_sorted(trials, |t| t.test_name.clone())?
        .into_iter()
        .map(|(test_name, members)| {
            let times: Vec<f64> = members.iter().map(|t| t.duration_ms).collect();
            HashingGroup {
                test_name,
                duration_ms: mean(&times),
                trials: members.len(),
            }
        })
        .collect())
}
