//! Record ingestion.
//!
//! Loads the two trial CSVs the harness writes, plus the pgbench summary
//! text files. A row that fails to parse or range-check is dropped and
//! counted, never fatal; a whole missing source is a typed error so the
//! caller can skip just the analyses that need it.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use log::warn;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::config::RunConfig;
use crate::error::IngestError;
use crate::record::{
    BulkExactTrial, BulkHllTrial, ExactTrial, HashingTrial, StorageSample, UnionTrial,
};

/// Rows that survived parsing and validation, plus the drop count.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub dropped: usize,
}

const UNION_COLUMNS: [&str; 6] = [
    "precision",
    "num_days",
    "estimated_count",
    "query_time_ms",
    "total_sketch_size_bytes",
    "run_number",
];

const EXACT_COLUMNS: [&str; 4] = ["num_days", "exact_count", "query_time_ms", "run_number"];

const BULK_EXACT_COLUMNS: [&str; 1] = ["duration_ms"];
const BULK_HLL_COLUMNS: [&str; 3] = ["test_name", "duration_ms", "relative_error"];
const STORAGE_COLUMNS: [&str; 3] = ["hll_type", "item_count", "storage_bytes"];
const HASHING_COLUMNS: [&str; 2] = ["test_name", "duration_ms"];

/// Load both trial collections. The two results are independent: a
/// missing source on one side never masks the other.
pub fn load_trials(
    config: &RunConfig,
) -> (
    Result<Loaded<UnionTrial>, IngestError>,
    Result<Loaded<ExactTrial>, IngestError>,
) {
    (
        load_union_trials(&config.union_path()),
        load_exact_trials(&config.exact_path()),
    )
}

pub fn load_union_trials(path: &Path) -> Result<Loaded<UnionTrial>, IngestError> {
    let file = open_source(path)?;
    load_csv(file, path, &UNION_COLUMNS, UnionTrial::validate)
}

pub fn load_exact_trials(path: &Path) -> Result<Loaded<ExactTrial>, IngestError> {
    let file = open_source(path)?;
    load_csv(file, path, &EXACT_COLUMNS, ExactTrial::validate)
}

/// Load both bulk-aggregation trial sets. As with [`load_trials`], the
/// two results are independent.
pub fn load_bulk_trials(
    config: &RunConfig,
) -> (
    Result<Loaded<BulkExactTrial>, IngestError>,
    Result<Loaded<BulkHllTrial>, IngestError>,
) {
    (
        load_bulk_exact_trials(&config.bulk_exact_path()),
        load_bulk_hll_trials(&config.bulk_hll_path()),
    )
}

pub fn load_bulk_exact_trials(path: &Path) -> Result<Loaded<BulkExactTrial>, IngestError> {
    let file = open_source(path)?;
    load_csv(file, path, &BULK_EXACT_COLUMNS, BulkExactTrial::validate)
}

pub fn load_bulk_hll_trials(path: &Path) -> Result<Loaded<BulkHllTrial>, IngestError> {
    let file = open_source(path)?;
    load_csv(file, path, &BULK_HLL_COLUMNS, BulkHllTrial::validate)
}

pub fn load_storage_samples(path: &Path) -> Result<Loaded<StorageSample>, IngestError> {
    let file = open_source(path)?;
    load_csv(file, path, &STORAGE_COLUMNS, StorageSample::validate)
}

pub fn load_hashing_trials(path: &Path) -> Result<Loaded<HashingTrial>, IngestError> {
    let file = open_source(path)?;
    load_csv(file, path, &HASHING_COLUMNS, HashingTrial::validate)
}

fn open_source(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            IngestError::MissingSource(path.to_path_buf())
        } else {
            IngestError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

fn load_csv<T, R>(
    source: R,
    path: &Path,
    required: &[&'static str],
    validate: fn(&T) -> Result<(), &'static str>,
) -> Result<Loaded<T>, IngestError>
where
    T: DeserializeOwned,
    R: io::Read,
{
    let mut rdr = csv::Reader::from_reader(source);
    let headers = rdr
        .headers()
        .map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?
        .clone();
    for &column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(IngestError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for (i, result) in rdr.deserialize::<T>().enumerate() {
        // Header is line 1, first data row is line 2.
        let line = i + 2;
        match result {
            Ok(row) => match validate(&row) {
                Ok(()) => rows.push(row),
                Err(reason) => {
                    dropped += 1;
                    warn!("{}: dropping row {line}: {reason}", path.display());
                }
            },
            Err(e) => {
                dropped += 1;
                warn!("{}: dropping malformed row {line}: {e}", path.display());
            }
        }
    }

    if rows.is_empty() {
        return Err(IngestError::EmptyInput {
            path: path.to_path_buf(),
            dropped,
        });
    }
    if dropped > 0 {
        warn!("{}: dropped {dropped} malformed rows", path.display());
    }
    Ok(Loaded { rows, dropped })
}

// --- pgbench summaries ---

/// Throughput figures extracted from one pgbench summary file.
#[derive(Debug, Clone, PartialEq)]
pub struct PgbenchSummary {
    pub test_name: String,
    pub tps: f64,
    pub latency_ms: f64,
}

/// The pgbench test files the harness writes, in report order.
pub const PGBENCH_TESTS: [(&str, &str); 4] = [
    ("low_card_insert", "04_summary_low_card_insert.txt"),
    ("high_card_insert", "05_summary_high_card_insert.txt"),
    ("read_cardinality", "06_summary_read_cardinality.txt"),
    ("read_union", "07_summary_read_union.txt"),
];

fn tps_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"tps = (\d+\.\d+) \(excluding").unwrap())
}

fn latency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"latency average = (\d+\.\d+) ms").unwrap())
}

/// Extract (tps, latency_ms) from pgbench summary text. `None` when
/// either fixed pattern is absent — the file format did not match.
pub fn parse_pgbench_summary(content: &str) -> Option<(f64, f64)> {
    let tps = tps_regex().captures(content)?.get(1)?.as_str();
    let latency = latency_regex().captures(content)?.get(1)?.as_str();
    // The patterns only admit decimal digits, so parsing cannot fail.
    Some((tps.parse().ok()?, latency.parse().ok()?))
}

/// Load every pgbench summary present in `input_dir`. A file that is
/// absent or unparseable is skipped for that file only, with a warning.
pub fn load_pgbench_summaries(input_dir: &Path) -> Vec<PgbenchSummary> {
    let mut summaries = Vec::new();
    for (test_name, file_name) in PGBENCH_TESTS {
        let path = input_dir.join(file_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("pgbench summary missing: {}", path.display());
                continue;
            }
            Err(e) => {
                warn!("failed to read {}: {e}", path.display());
                continue;
            }
        };
        match parse_pgbench_summary(&content) {
            Some((tps, latency_ms)) => summaries.push(PgbenchSummary {
                test_name: test_name.to_string(),
                tps,
                latency_ms,
            }),
            None => warn!("could not parse pgbench summary: {}", path.display()),
        }
    }
    summaries
}
