//! Comparison: join the aggregated tables and derive the four metrics.
//!
//! The join is on `num_days` only. Precision rides along on the union
//! side; one exact baseline per window is shared across all precisions.
//! Keys present on only one side are returned (and logged), never
//! silently dropped.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::aggregate::{ExactGroup, UnionGroup};
use crate::metric::Metric;

/// One joined (precision, num_days) comparison with derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub precision: u32,
    pub num_days: u32,
    pub avg_estimate: f64,
    pub exact_count: f64,
    pub union_time_ms: f64,
    pub exact_time_ms: f64,
    pub error_absolute: f64,
    /// `error_absolute / exact_count * 100`; degenerate when the exact
    /// count is zero.
    pub error_pct: Metric,
    /// `exact_time_ms / union_time_ms`; degenerate when the union time
    /// is zero.
    pub speedup_factor: Metric,
    pub sketch_size_kb: f64,
    /// `speedup_factor / error_pct`; degenerate when either input is
    /// degenerate or the error is exactly zero (perfect accuracy).
    pub efficiency_score: Metric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A union group's window has no exact baseline.
    MissingExact,
    /// An exact window was measured but no union group covers it.
    MissingApprox,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::MissingExact => "missing_exact",
            SkipReason::MissingApprox => "missing_approx",
        }
    }
}

/// A group key that could not be joined, with the side it was missing from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedKey {
    /// Present for union-side keys; exact groups carry no precision.
    pub precision: Option<u32>,
    pub num_days: u32,
    pub reason: SkipReason,
}

/// Inner-join the aggregated tables on `num_days` and derive metrics.
///
/// Output rows ascend by (precision, num_days); skipped keys are logged
/// and returned so the caller can account for them.
pub fn compare(
    union_groups: &[UnionGroup],
    exact_groups: &[ExactGroup],
) -> (Vec<ComparisonRow>, Vec<SkippedKey>) {
    let exact_by_day: BTreeMap<u32, &ExactGroup> =
        exact_groups.iter().map(|g| (g.num_days, g)).collect();
    let union_days: BTreeSet<u32> = union_groups.iter().map(|g| g.num_days).collect();

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for union in union_groups {
        match exact_by_day.get(&union.num_days) {
            Some(exact) => rows.push(derive_row(union, exact)),
            None => skipped.push(SkippedKey {
                precision: Some(union.precision),
                num_days: union.num_days,
                reason: SkipReason::MissingExact,
            }),
        }
    }
    for exact in exact_groups {
        if !union_days.contains(&exact.num_days) {
            skipped.push(SkippedKey {
                precision: None,
                num_days: exact.num_days,
                reason: SkipReason::MissingApprox,
            });
        }
    }

    rows.sort_by_key(|r| (r.precision, r.num_days));
    skipped.sort_by_key(|s| (s.num_days, s.precision));

    for skip in &skipped {
        match skip.precision {
            Some(p) => warn!(
                "join mismatch: precision={p} num_days={} skipped ({})",
                skip.num_days,
                skip.reason.as_str()
            ),
            None => warn!(
                "join mismatch: num_days={} skipped ({})",
                skip.num_days,
                skip.reason.as_str()
            ),
        }
    }

    (rows, skipped)
}

fn derive_row(union: &UnionGroup, exact: &ExactGroup) -> ComparisonRow {
    let error_absolute = (union.avg_estimate - exact.exact_count).abs();
    let error_pct = Metric::ratio(error_absolute, exact.exact_count).map(|v| v * 100.0);
    let speedup_factor = Metric::ratio(exact.exact_time_ms, union.union_time_ms);
    let efficiency_score = match (speedup_factor, error_pct) {
        (Metric::Value(speedup), Metric::Value(err)) if err != 0.0 => {
            Metric::Value(speedup / err)
        }
        _ => Metric::Degenerate,
    };

    ComparisonRow {
        precision: union.precision,
        num_days: union.num_days,
        avg_estimate: union.avg_estimate,
        exact_count: exact.exact_count,
        union_time_ms: union.union_time_ms,
        exact_time_ms: exact.exact_time_ms,
        error_absolute,
        error_pct,
        speedup_factor,
        sketch_size_kb: union.avg_sketch_bytes / 1024.0,
        efficiency_score,
    }
}
