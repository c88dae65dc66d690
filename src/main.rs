use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use hllbench::aggregate::{BulkGroup, HashingGroup};
use hllbench::compare::{self, ComparisonRow, SkippedKey};
use hllbench::config::RunConfig;
use hllbench::ingest;
use hllbench::record::StorageSample;
use hllbench::report::{self, AuxReport, ComparisonReport};
use hllbench::summary::{self, Dimension, Summary};
use hllbench::{aggregate, table};

#[derive(Parser)]
#[command(
    name = "hllbench",
    about = "Aggregate and compare HLL-vs-exact benchmark results",
    version
)]
struct Cli {
    /// Directory containing the harness output (trial CSVs, pgbench summaries)
    input_dir: PathBuf,

    /// Destination for derived tables and chart series
    /// (default: <input_dir>/analysis)
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// File name of the sketch-union trials CSV
    #[arg(long, default_value = "union_detailed.csv")]
    union_file: String,

    /// File name of the exact-count trials CSV
    #[arg(long, default_value = "exact_detailed.csv")]
    exact_file: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = match cli.output_dir {
        Some(output_dir) => RunConfig::new(cli.input_dir, output_dir),
        None => RunConfig::with_default_output(cli.input_dir),
    };
    config.union_file = cli.union_file;
    config.exact_file = cli.exact_file;

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    run(&config)
}

fn run(config: &RunConfig) -> Result<()> {
    let comparison = run_comparison(config)?;
    let bulk = run_bulk(config)?;
    let storage = run_storage(config);
    let hashing = run_hashing(config)?;
    let pgbench = ingest::load_pgbench_summaries(&config.input_dir);

    if comparison.is_none()
        && bulk.is_empty()
        && storage.is_empty()
        && hashing.is_empty()
        && pgbench.is_empty()
    {
        anyhow::bail!("no analyses could run: all input sources missing or empty");
    }

    let aux = AuxReport {
        bulk: &bulk,
        storage: &storage,
        hashing: &hashing,
    };

    let stdout = io::stdout().lock();
    let mut out = BufWriter::new(stdout);
    match &comparison {
        Some((rows, skipped)) => {
            let overall = summary::overall_stats(rows);
            let by_precision = match summary::summarize(rows, Dimension::ByPrecision) {
                Summary::ByPrecision(parts) => parts,
                _ => Vec::new(),
            };
            let report = ComparisonReport {
                rows,
                overall: &overall,
                by_precision: &by_precision,
                skipped,
            };
            report::render_summary(&mut out, Some(&report), &aux, &pgbench)?;
            report::write_chart_series(config, rows, &aux, &pgbench)?;
        }
        None => {
            report::render_summary(&mut out, None, &aux, &pgbench)?;
            report::write_chart_series(config, &[], &aux, &pgbench)?;
        }
    }
    out.flush()?;

    Ok(())
}

/// The comparison analysis: load both trial sets, aggregate, join,
/// persist. Returns `None` (after logging) when the analysis cannot
/// run, so sibling analyses still proceed.
fn run_comparison(config: &RunConfig) -> Result<Option<(Vec<ComparisonRow>, Vec<SkippedKey>)>> {
    let (union_loaded, exact_loaded) = match ingest::load_trials(config) {
        (Ok(union), Ok(exact)) => (union, exact),
        (union_res, exact_res) => {
            if let Err(e) = union_res {
                error!("comparison analysis skipped: {e}");
            }
            if let Err(e) = exact_res {
                error!("comparison analysis skipped: {e}");
            }
            return Ok(None);
        }
    };
    info!(
        "loaded {} union trials ({} dropped), {} exact trials ({} dropped)",
        union_loaded.rows.len(),
        union_loaded.dropped,
        exact_loaded.rows.len(),
        exact_loaded.dropped
    );

    // The loaders guarantee non-empty row sets, so aggregation's
    // empty-input failure can only mean a caller bug here.
    let union_groups = aggregate::aggregate_union(&union_loaded.rows)?;
    let exact_groups = aggregate::aggregate_exact(&exact_loaded.rows)?;

    let (rows, skipped) = compare::compare(&union_groups, &exact_groups);
    if rows.is_empty() {
        error!("comparison analysis skipped: no overlapping time windows between union and exact trials");
        return Ok(None);
    }

    let comparison_path = config.comparison_path();
    table::write_comparison(&comparison_path, &rows)?;
    info!("wrote {}", comparison_path.display());

    Ok(Some((rows, skipped)))
}

/// The bulk-aggregation analysis: exact baseline vs HLL variants.
/// Needs both sources; skips (after logging) when either is missing.
fn run_bulk(config: &RunConfig) -> Result<Vec<BulkGroup>> {
    let (exact_loaded, hll_loaded) = match ingest::load_bulk_trials(config) {
        (Ok(exact), Ok(hll)) => (exact, hll),
        (exact_res, hll_res) => {
            if let Err(e) = exact_res {
                error!("bulk analysis skipped: {e}");
            }
            if let Err(e) = hll_res {
                error!("bulk analysis skipped: {e}");
            }
            return Ok(Vec::new());
        }
    };
    info!(
        "loaded {} bulk exact trials ({} dropped), {} bulk hll trials ({} dropped)",
        exact_loaded.rows.len(),
        exact_loaded.dropped,
        hll_loaded.rows.len(),
        hll_loaded.dropped
    );
    Ok(aggregate::aggregate_bulk(&exact_loaded.rows, &hll_loaded.rows)?)
}

fn run_storage(config: &RunConfig) -> Vec<StorageSample> {
    match ingest::load_storage_samples(&config.storage_path()) {
        Ok(loaded) => {
            info!(
                "loaded {} storage samples ({} dropped)",
                loaded.rows.len(),
                loaded.dropped
            );
            loaded.rows
        }
        Err(e) => {
            error!("storage analysis skipped: {e}");
            Vec::new()
        }
    }
}

fn run_hashing(config: &RunConfig) -> Result<Vec<HashingGroup>> {
    match ingest::load_hashing_trials(&config.hashing_path()) {
        Ok(loaded) => {
            info!(
                "loaded {} hashing trials ({} dropped)",
                loaded.rows.len(),
                loaded.dropped
            );
            Ok(aggregate::aggregate_hashing(&loaded.rows)?)
        }
        Err(e) => {
            error!("hashing analysis skipped: {e}");
            Ok(Vec::new())
        }
    }
}
