//! Presentation: the plain-text summary report and chart-ready series.
//!
//! Everything here maps already-derived values onto text or flat CSV
//! series for external plotting tools; none of the four comparison
//! metrics is recomputed.

use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use crate::aggregate::{BulkGroup, HashingGroup, group_sorted, mean};
use crate::compare::{ComparisonRow, SkipReason, SkippedKey};
use crate::config::RunConfig;
use crate::ingest::PgbenchSummary;
use crate::record::StorageSample;
use crate::summary::SummaryStats;

/// Everything the report needs from a completed comparison analysis.
pub struct ComparisonReport<'a> {
    pub rows: &'a [ComparisonRow],
    pub overall: &'a SummaryStats,
    pub by_precision: &'a [(u32, SummaryStats)],
    pub skipped: &'a [SkippedKey],
}

/// The side analyses; each slice is empty when its sources were absent.
#[derive(Default)]
pub struct AuxReport<'a> {
    pub bulk: &'a [BulkGroup],
    pub storage: &'a [StorageSample],
    pub hashing: &'a [HashingGroup],
}

const RULE: &str =
    "======================================================================";

/// Write the human-readable summary report.
pub fn render_summary<W: io::Write>(
    out: &mut W,
    comparison: Option<&ComparisonReport<'_>>,
    aux: &AuxReport<'_>,
    pgbench: &[PgbenchSummary],
) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "BENCHMARK SUMMARY STATISTICS")?;
    writeln!(out, "{RULE}")?;

    match comparison {
        Some(report) => render_comparison(out, report)?,
        None => writeln!(out, "\nComparison analysis skipped: no joined rows.")?,
    }

    if !aux.bulk.is_empty() {
        writeln!(out, "\nBulk aggregation (avg per trial):")?;
        for group in aux.bulk {
            match group.relative_error_pct {
                Some(err) => writeln!(
                    out,
                    "  {:<20} {:>8.1} ms   {:.3}% error",
                    group.test_name, group.duration_ms, err
                )?,
                None => writeln!(
                    out,
                    "  {:<20} {:>8.1} ms",
                    group.test_name, group.duration_ms
                )?,
            }
        }
    }

    if !aux.storage.is_empty() {
        writeln!(out, "\nStorage footprint ({} samples):", aux.storage.len())?;
        for (hll_type, largest) in storage_extremes(aux.storage) {
            writeln!(
                out,
                "  {:<20} {} bytes at {} items",
                hll_type, largest.storage_bytes, largest.item_count
            )?;
        }
    }

    if !aux.hashing.is_empty() {
        writeln!(out, "\nHashing overhead (avg per trial):")?;
        for group in aux.hashing {
            writeln!(
                out,
                "  {:<20} {:>8.1} ms",
                group.test_name, group.duration_ms
            )?;
        }
    }

    if !pgbench.is_empty() {
        writeln!(out, "\npgbench throughput:")?;
        for summary in pgbench {
            writeln!(
                out,
                "  {:<20} {:>10.1} tps   {:>8.3} ms latency",
                summary.test_name, summary.tps, summary.latency_ms
            )?;
        }
    }

    writeln!(out, "{RULE}")?;
    Ok(())
}

fn render_comparison<W: io::Write>(out: &mut W, report: &ComparisonReport<'_>) -> io::Result<()> {
    let overall = report.overall;

    writeln!(out, "\nOverall performance ({} rows):", overall.rows)?;
    match &overall.speedup.stats {
        Some(stats) => {
            writeln!(out, "  average speedup: {:.1}x", stats.mean)?;
            writeln!(out, "  max speedup:     {:.1}x", stats.max)?;
            writeln!(out, "  min speedup:     {:.1}x", stats.min)?;
        }
        None => writeln!(out, "  speedup: n/a (every row degenerate)")?,
    }
    if overall.speedup.excluded_degenerate > 0 {
        writeln!(
            out,
            "  excluded from speedup (zero union time): {}",
            overall.speedup.excluded_degenerate
        )?;
    }

    writeln!(out, "\nAccuracy:")?;
    match &overall.error_pct.stats {
        Some(stats) => {
            writeln!(out, "  average error: {:.3}%", stats.mean)?;
            writeln!(out, "  max error:     {:.3}%", stats.max)?;
            writeln!(out, "  min error:     {:.3}%", stats.min)?;
        }
        None => writeln!(out, "  error: n/a (every row degenerate)")?,
    }
    if overall.error_pct.excluded_degenerate > 0 {
        writeln!(
            out,
            "  excluded from error (zero exact count): {}",
            overall.error_pct.excluded_degenerate
        )?;
    }

    writeln!(out, "\nQuery time:")?;
    writeln!(
        out,
        "  avg union time:       {:.2} ms",
        overall.mean_union_time_ms
    )?;
    writeln!(
        out,
        "  avg exact time:       {:.2} ms",
        overall.mean_exact_time_ms
    )?;
    writeln!(
        out,
        "  time saved per query: {:.2} ms",
        overall.mean_time_saved_ms
    )?;

    if !report.by_precision.is_empty() {
        writeln!(out, "\nBy precision:")?;
        for (precision, stats) in report.by_precision {
            let speedup = stats
                .speedup
                .stats
                .map(|s| format!("{:.1}x avg speedup", s.mean))
                .unwrap_or_else(|| "speedup n/a".to_string());
            let error = stats
                .error_pct
                .stats
                .map(|s| format!("{:.3}% avg error", s.mean))
                .unwrap_or_else(|| "error n/a".to_string());
            writeln!(out, "  p={precision}: {speedup}, {error}")?;
        }
    }

    writeln!(out, "\nStorage by precision:")?;
    for (precision, sketch_kb, _) in storage_by_precision(report.rows) {
        writeln!(out, "  p={precision}: {sketch_kb:.1} KB avg")?;
    }

    writeln!(out, "\nBest configuration by use case:")?;
    write_best(
        out,
        "fastest:      ",
        overall.max_speedup_row.as_ref(),
        |r| r.speedup_factor.value(),
        |v| format!("{v:.1}x"),
    )?;
    write_best(
        out,
        "most accurate:",
        overall.min_error_row.as_ref(),
        |r| r.error_pct.value(),
        |v| format!("{v:.3}%"),
    )?;
    write_best(
        out,
        "best balance: ",
        overall.max_efficiency_row.as_ref(),
        |r| r.efficiency_score.value(),
        |v| format!("score {v:.1}"),
    )?;

    if !report.skipped.is_empty() {
        let missing_exact = report
            .skipped
            .iter()
            .filter(|s| s.reason == SkipReason::MissingExact)
            .count();
        let missing_approx = report.skipped.len() - missing_exact;
        writeln!(
            out,
            "\nSkipped join keys: {} (missing_exact: {missing_exact}, missing_approx: {missing_approx})",
            report.skipped.len()
        )?;
    }

    Ok(())
}

fn write_best<W: io::Write>(
    out: &mut W,
    label: &str,
    row: Option<&ComparisonRow>,
    value: impl Fn(&ComparisonRow) -> Option<f64>,
    fmt: impl Fn(f64) -> String,
) -> io::Result<()> {
    match row.and_then(|r| value(r).map(|v| (r, v))) {
        Some((r, v)) => writeln!(
            out,
            "  {label} p={}, {} days ({})",
            r.precision,
            r.num_days,
            fmt(v)
        ),
        None => writeln!(out, "  {label} n/a"),
    }
}

/// Mean sketch size and mean non-degenerate error per precision,
/// ascending by precision.
fn storage_by_precision(rows: &[ComparisonRow]) -> Vec<(u32, f64, Option<f64>)> {
    let groups = match group_sorted(rows, |r| r.precision) {
        Ok(groups) => groups,
        Err(_) => return Vec::new(),
    };
    groups
        .into_iter()
        .map(|(precision, members)| {
            let sizes: Vec<f64> = members.iter().map(|r| r.sketch_size_kb).collect();
            let errors: Vec<f64> = members
                .iter()
                .filter_map(|r| r.error_pct.value())
                .collect();
            let avg_error = if errors.is_empty() {
                None
            } else {
                Some(mean(&errors))
            };
            (precision, mean(&sizes), avg_error)
        })
        .collect()
}

/// The largest sample per HLL type, ascending by type name. Storage
/// samples are reported raw elsewhere; the text summary shows each
/// growth curve's endpoint.
fn storage_extremes(samples: &[StorageSample]) -> Vec<(String, &StorageSample)> {
    let groups = match group_sorted(samples, |s| s.hll_type.clone()) {
        Ok(groups) => groups,
        Err(_) => return Vec::new(),
    };
    groups
        .into_iter()
        .filter_map(|(hll_type, members)| {
            members
                .into_iter()
                .max_by_key(|s| s.item_count)
                .map(|s| (hll_type, s))
        })
        .collect()
}

// --- chart-ready series ---

/// Emit the per-chart CSV data series under `<output_dir>/series/`.
/// Each file is one chart's numbers; rendering stays external.
pub fn write_chart_series(
    config: &RunConfig,
    rows: &[ComparisonRow],
    aux: &AuxReport<'_>,
    pgbench: &[PgbenchSummary],
) -> Result<()> {
    if !rows.is_empty() {
        write_series(
            &config.series_path("speedup_by_window.csv"),
            &["precision", "num_days", "speedup_factor"],
            rows.iter().map(|r| {
                vec![
                    r.precision.to_string(),
                    r.num_days.to_string(),
                    fmt_opt(r.speedup_factor.value()),
                ]
            }),
        )?;

        write_series(
            &config.series_path("error_by_window.csv"),
            &["precision", "num_days", "error_pct"],
            rows.iter().map(|r| {
                vec![
                    r.precision.to_string(),
                    r.num_days.to_string(),
                    fmt_opt(r.error_pct.value()),
                ]
            }),
        )?;

        write_series(
            &config.series_path("query_time_by_window.csv"),
            &["precision", "num_days", "union_time_ms", "exact_time_ms"],
            rows.iter().map(|r| {
                vec![
                    r.precision.to_string(),
                    r.num_days.to_string(),
                    r.union_time_ms.to_string(),
                    r.exact_time_ms.to_string(),
                ]
            }),
        )?;

        write_series(
            &config.series_path("time_per_sketch.csv"),
            &["precision", "num_days", "time_per_sketch_ms"],
            rows.iter().map(|r| {
                // num_days > 0 is an ingestion invariant.
                let per_sketch = r.union_time_ms / r.num_days as f64;
                vec![
                    r.precision.to_string(),
                    r.num_days.to_string(),
                    per_sketch.to_string(),
                ]
            }),
        )?;

        write_series(
            &config.series_path("storage_by_precision.csv"),
            &["precision", "avg_sketch_size_kb", "avg_error_pct"],
            storage_by_precision(rows).into_iter().map(
                |(precision, sketch_kb, avg_error)| {
                    vec![
                        precision.to_string(),
                        sketch_kb.to_string(),
                        fmt_opt(avg_error),
                    ]
                },
            ),
        )?;
    }

    if !aux.bulk.is_empty() {
        write_series(
            &config.series_path("bulk_speed.csv"),
            &["test_name", "avg_duration_ms"],
            aux.bulk.iter().map(|g| {
                vec![g.test_name.clone(), g.duration_ms.to_string()]
            }),
        )?;

        write_series(
            &config.series_path("bulk_error.csv"),
            &["test_name", "avg_relative_error_pct"],
            aux.bulk.iter().filter_map(|g| {
                g.relative_error_pct
                    .map(|err| vec![g.test_name.clone(), err.to_string()])
            }),
        )?;
    }

    if !aux.storage.is_empty() {
        write_series(
            &config.series_path("storage_footprint.csv"),
            &["hll_type", "item_count", "storage_bytes"],
            aux.storage.iter().map(|s| {
                vec![
                    s.hll_type.clone(),
                    s.item_count.to_string(),
                    s.storage_bytes.to_string(),
                ]
            }),
        )?;
    }

    if !aux.hashing.is_empty() {
        write_series(
            &config.series_path("hashing_overhead.csv"),
            &["test_name", "avg_duration_ms"],
            aux.hashing.iter().map(|g| {
                vec![g.test_name.clone(), g.duration_ms.to_string()]
            }),
        )?;
    }

    if !pgbench.is_empty() {
        write_series(
            &config.series_path("pgbench_summary.csv"),
            &["test_name", "tps", "latency_ms"],
            pgbench.iter().map(|s| {
                vec![
                    s.test_name.clone(),
                    s.tps.to_string(),
                    s.latency_ms.to_string(),
                ]
            }),
        )?;
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_series<I>(path: &Path, headers: &[&str], records: I) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    wtr.write_record(headers)
        .with_context(|| format!("failed to write {}", path.display()))?;
    for record in records {
        wtr.write_record(&record)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}
