/// End-to-end tests: run the `hllbench` binary on fixture directories and
/// check the report text, the persisted comparison table, and the chart
/// series.
use std::fs;
use std::path::Path;
use std::process::Command;

use hllbench::metric::Metric;
use hllbench::summary::{self, Dimension};
use hllbench::table;

const UNION_HEADER: &str =
    "precision,num_days,estimated_count,query_time_ms,total_sketch_size_bytes,run_number";
const EXACT_HEADER: &str = "num_days,exact_count,query_time_ms,run_number";

fn hllbench(dir: &Path) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_hllbench"))
        .arg(dir)
        .output()
        .expect("failed to run hllbench");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn write_union(dir: &Path, rows: &[&str]) {
    let mut text = String::from(UNION_HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    fs::write(dir.join("union_detailed.csv"), text).unwrap();
}

fn write_exact(dir: &Path, rows: &[&str]) {
    let mut text = String::from(EXACT_HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    fs::write(dir.join("exact_detailed.csv"), text).unwrap();
}

#[test]
fn full_pipeline_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    write_union(
        dir.path(),
        &[
            "10,7,9923.0,0.5,1280,1",
            "10,7,9941.0,0.6,1280,2",
            "10,30,39800.0,1.4,1280,1",
            "12,7,9987.0,0.7,5120,1",
            "12,30,39950.0,1.9,5120,1",
        ],
    );
    write_exact(
        dir.path(),
        &[
            "7,9985.0,50.0,1",
            "7,9985.0,52.0,2",
            "30,40000.0,210.0,1",
        ],
    );

    let (ok, stdout, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");
    assert!(stdout.contains("BENCHMARK SUMMARY STATISTICS"));
    assert!(stdout.contains("average speedup:"));
    assert!(stdout.contains("Best configuration by use case:"));
    assert!(stdout.contains("By precision:"));

    let analysis = dir.path().join("analysis");
    let rows = table::read_comparison(&analysis.join("comparison.csv")).unwrap();
    assert_eq!(rows.len(), 4);

    // One row per joined (precision, num_days), ascending.
    let keys: Vec<(u32, u32)> = rows.iter().map(|r| (r.precision, r.num_days)).collect();
    assert_eq!(keys, vec![(10, 7), (10, 30), (12, 7), (12, 30)]);

    // Trials {0.5, 0.6} vs {50.0, 52.0}: speedup 51.0 / 0.55 ≈ 92.73.
    let speedup = rows[0].speedup_factor.value().unwrap();
    assert!((speedup - 92.7272727).abs() < 1e-5, "speedup = {speedup}");

    for series in [
        "speedup_by_window.csv",
        "error_by_window.csv",
        "query_time_by_window.csv",
        "time_per_sketch.csv",
        "storage_by_precision.csv",
    ] {
        assert!(
            analysis.join("series").join(series).exists(),
            "missing series {series}"
        );
    }
}

#[test]
fn round_trip_preserves_summary_stats() {
    let dir = tempfile::tempdir().unwrap();
    write_union(
        dir.path(),
        &[
            "10,7,9923.0,0.52,1280,1",
            "12,7,9987.0,0.73,5120,1",
            "14,7,9990.0,1.18,20480,1",
        ],
    );
    write_exact(dir.path(), &["7,9985.0,25.3,1", "7,9985.0,24.1,2"]);

    let (ok, _, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");

    let rows = table::read_comparison(&dir.path().join("analysis/comparison.csv")).unwrap();
    // Summarizing the deserialized table matches summarizing it again:
    // numeric fields survived the file round trip bit-for-bit.
    let first = summary::summarize(&rows, Dimension::Overall);
    let reread = table::read_comparison(&dir.path().join("analysis/comparison.csv")).unwrap();
    assert_eq!(rows, reread);
    assert_eq!(first, summary::summarize(&reread, Dimension::Overall));
}

#[test]
fn join_mismatch_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_union(
        dir.path(),
        &["10,7,9923.0,0.5,1280,1", "10,90,99000.0,4.0,1280,1"],
    );
    write_exact(dir.path(), &["7,9985.0,50.0,1", "60,80000.0,400.0,1"]);

    let (ok, stdout, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");
    assert!(stderr.contains("join mismatch"), "stderr: {stderr}");
    assert!(stdout.contains("Skipped join keys: 2"));

    let rows = table::read_comparison(&dir.path().join("analysis/comparison.csv")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].num_days, 7);
}

#[test]
fn zero_exact_count_row_survives_with_degenerate_error() {
    let dir = tempfile::tempdir().unwrap();
    write_union(dir.path(), &["10,7,0.0,0.5,1280,1"]);
    write_exact(dir.path(), &["7,0.0,50.0,1"]);

    let (ok, stdout, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");

    let rows = table::read_comparison(&dir.path().join("analysis/comparison.csv")).unwrap();
    assert_eq!(rows[0].error_absolute, 0.0);
    assert_eq!(rows[0].error_pct, Metric::Degenerate);
    // The degenerate error is excluded from the report's reductions.
    assert!(stdout.contains("error: n/a (every row degenerate)"));
    assert!(stdout.contains("excluded from error (zero exact count): 1"));
}

#[test]
fn missing_trials_still_reports_pgbench() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("07_summary_read_union.txt"),
        "latency average = 1.337 ms\ntps = 5983.214786 (excluding connections establishing)\n",
    )
    .unwrap();

    let (ok, stdout, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");
    assert!(stdout.contains("Comparison analysis skipped"));
    assert!(stdout.contains("read_union"));
    assert!(stderr.contains("comparison analysis skipped"), "stderr: {stderr}");

    let series = dir.path().join("analysis/series/pgbench_summary.csv");
    let text = fs::read_to_string(series).unwrap();
    assert!(text.contains("read_union,5983.214786,1.337"));
}

#[test]
fn nothing_to_analyze_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (ok, _, stderr) = hllbench(dir.path());
    assert!(!ok);
    assert!(stderr.contains("no analyses could run"), "stderr: {stderr}");
}

#[test]
fn nonfinite_rows_dropped_before_aggregation() {
    let dir = tempfile::tempdir().unwrap();
    write_union(
        dir.path(),
        &["10,7,NaN,0.5,1280,1", "10,7,9941.0,0.6,1280,2"],
    );
    write_exact(dir.path(), &["7,9985.0,50.0,1"]);

    let (ok, _, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");
    assert!(stderr.contains("dropping row"), "stderr: {stderr}");

    let rows = table::read_comparison(&dir.path().join("analysis/comparison.csv")).unwrap();
    assert_eq!(rows.len(), 1);
    // Only the finite trial reaches the aggregated estimate.
    assert_eq!(rows[0].avg_estimate, 9941.0);
    assert!(rows[0].error_pct.value().unwrap().is_finite());
}

#[test]
fn side_analyses_run_independently() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("03_results_hashing.csv"),
        "test_name,duration_ms\nhash_bigint,12.0\nhash_bigint,13.0\nhash_text,30.0\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("02_results_storage.csv"),
        "hll_type,item_count,storage_bytes\nplain,1000,1280\nplain,100000,16384\n",
    )
    .unwrap();

    let (ok, stdout, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");
    assert!(stdout.contains("Comparison analysis skipped"));
    assert!(stdout.contains("Storage footprint (2 samples):"));
    assert!(stdout.contains("Hashing overhead"));
    assert!(stderr.contains("bulk analysis skipped"), "stderr: {stderr}");

    let series = dir.path().join("analysis/series");
    let hashing = fs::read_to_string(series.join("hashing_overhead.csv")).unwrap();
    assert!(hashing.contains("hash_bigint,12.5"));
    let storage = fs::read_to_string(series.join("storage_footprint.csv")).unwrap();
    assert!(storage.contains("plain,100000,16384"));
    assert!(!series.join("bulk_speed.csv").exists());
}

#[test]
fn bulk_analysis_reports_baseline_and_variants() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("01_results_bulk_exact.csv"),
        "duration_ms\n100.0\n120.0\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("01_results_bulk_hll.csv"),
        "test_name,duration_ms,relative_error\nhll_p12,40.0,0.5\nhll_p12,60.0,0.75\n",
    )
    .unwrap();

    let (ok, stdout, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");
    assert!(stdout.contains("Bulk aggregation"));
    assert!(stdout.contains("exact_count"));
    assert!(stdout.contains("0.625% error"));

    let speed = fs::read_to_string(
        dir.path().join("analysis/series/bulk_speed.csv"),
    )
    .unwrap();
    assert!(speed.contains("exact_count,110"));
    assert!(speed.contains("hll_p12,50"));
}

#[test]
fn malformed_rows_dropped_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    write_union(
        dir.path(),
        &["10,7,9923.0,0.5,1280,1", "10,7,not_a_number,0.6,1280,2"],
    );
    write_exact(dir.path(), &["7,9985.0,50.0,1"]);

    let (ok, _, stderr) = hllbench(dir.path());
    assert!(ok, "hllbench failed: {stderr}");
    assert!(stderr.contains("dropping malformed row"), "stderr: {stderr}");

    let rows = table::read_comparison(&dir.path().join("analysis/comparison.csv")).unwrap();
    // The surviving single trial still aggregates (stddev 0 by policy).
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].union_time_ms, 0.5);
}
