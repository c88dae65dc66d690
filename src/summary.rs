//! Summary reduction over the joined comparison table.
//!
//! Collapses comparison rows into scalar statistics, either overall or
//! partitioned by precision / time window. Degenerate metrics are
//! excluded from the reduction they would poison, and the exclusion
//! count is carried alongside the statistic.

use crate::aggregate::{group_sorted, mean};
use crate::compare::ComparisonRow;
use crate::metric::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Overall,
    ByPrecision,
    ByWindow,
}

/// Mean/min/max over the non-degenerate values of one metric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// A reduction over one metric field, with degenerate-row accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// `None` when every row was degenerate on this field.
    pub stats: Option<FieldStats>,
    pub included: usize,
    pub excluded_degenerate: usize,
}

impl Reduction {
    fn over(rows: &[ComparisonRow], field: impl Fn(&ComparisonRow) -> Metric) -> Reduction {
        let values: Vec<f64> = rows.iter().filter_map(|r| field(r).value()).collect();
        let excluded_degenerate = rows.len() - values.len();
        if values.is_empty() {
            return Reduction {
                stats: None,
                included: 0,
                excluded_degenerate,
            };
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Reduction {
            stats: Some(FieldStats {
                mean: mean(&values),
                min,
                max,
            }),
            included: values.len(),
            excluded_degenerate,
        }
    }
}

/// Scalar statistics for one set of comparison rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub rows: usize,
    pub speedup: Reduction,
    pub error_pct: Reduction,
    /// Plain means over all rows (query times are never degenerate).
    pub mean_union_time_ms: f64,
    pub mean_exact_time_ms: f64,
    pub mean_time_saved_ms: f64,
    /// Row with the largest non-degenerate speedup; ties broken by
    /// smallest num_days, then smallest precision.
    pub max_speedup_row: Option<ComparisonRow>,
    /// Row with the smallest non-degenerate error, same tie-break.
    pub min_error_row: Option<ComparisonRow>,
    /// Row with the largest non-degenerate efficiency, same tie-break.
    pub max_efficiency_row: Option<ComparisonRow>,
}

/// Summary output, shaped by the requested dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Overall(SummaryStats),
    ByPrecision(Vec<(u32, SummaryStats)>),
    ByWindow(Vec<(u32, SummaryStats)>),
}

pub fn summarize(rows: &[ComparisonRow], dimension: Dimension) -> Summary {
    match dimension {
        Dimension::Overall => Summary::Overall(overall_stats(rows)),
        Dimension::ByPrecision => Summary::ByPrecision(partitioned(rows, |r| r.precision)),
        Dimension::ByWindow => Summary::ByWindow(partitioned(rows, |r| r.num_days)),
    }
}

/// Statistics over one row set. Also usable directly when the caller
/// knows it wants the overall dimension.
pub fn overall_stats(rows: &[ComparisonRow]) -> SummaryStats {
    let (mean_union, mean_exact, mean_saved) = if rows.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let union_times: Vec<f64> = rows.iter().map(|r| r.union_time_ms).collect();
        let exact_times: Vec<f64> = rows.iter().map(|r| r.exact_time_ms).collect();
        let saved: Vec<f64> = rows
            .iter()
            .map(|r| r.exact_time_ms - r.union_time_ms)
            .collect();
        (mean(&union_times), mean(&exact_times), mean(&saved))
    };

    SummaryStats {
        rows: rows.len(),
        speedup: Reduction::over(rows, |r| r.speedup_factor),
        error_pct: Reduction::over(rows, |r| r.error_pct),
        mean_union_time_ms: mean_union,
        mean_exact_time_ms: mean_exact,
        mean_time_saved_ms: mean_saved,
        max_speedup_row: pick_best(rows, |r| r.speedup_factor, true).cloned(),
        min_error_row: pick_best(rows, |r| r.error_pct, false).cloned(),
        max_efficiency_row: pick_best(rows, |r| r.efficiency_score, true).cloned(),
    }
}

fn partitioned(
    rows: &[ComparisonRow],
    key: impl Fn(&ComparisonRow) -> u32,
) -> Vec<(u32, SummaryStats)> {
    let groups = match group_sorted(rows, &key) {
        Ok(groups) => groups,
        Err(_) => return Vec::new(),
    };
    groups
        .into_iter()
        .map(|(k, members)| {
            let owned: Vec<ComparisonRow> = members.into_iter().cloned().collect();
            (k, overall_stats(&owned))
        })
        .collect()
}

/// The row with the best non-degenerate value of `field`. Ties resolve to
/// the smallest num_days, then the smallest precision, so the pick is
/// deterministic regardless of input order.
fn pick_best<'a>(
    rows: &'a [ComparisonRow],
    field: impl Fn(&ComparisonRow) -> Metric,
    prefer_larger: bool,
) -> Option<&'a ComparisonRow> {
    let mut best: Option<&ComparisonRow> = None;
    for row in rows {
        let Some(value) = field(row).value() else {
            continue;
        };
        let Some(current) = best else {
            best = Some(row);
            continue;
        };
        let Some(best_value) = field(current).value() else {
            continue;
        };
        let better = if prefer_larger {
            value > best_value
        } else {
            value < best_value
        };
        let wins_tie = value == best_value
            && (row.num_days, row.precision) < (current.num_days, current.precision);
        if better || wins_tie {
            best = Some(row);
        }
    }
    best
}
