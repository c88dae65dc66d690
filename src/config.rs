//! Run configuration.
//!
//! Everything the pipeline needs to locate inputs and place outputs,
//! passed in explicitly at construction time.

use std::path::PathBuf;

pub const DEFAULT_UNION_FILE: &str = "union_detailed.csv";
pub const DEFAULT_EXACT_FILE: &str = "exact_detailed.csv";
pub const COMPARISON_FILE: &str = "comparison.csv";

// Side-analysis sources; the harness writes these under fixed names.
pub const BULK_EXACT_FILE: &str = "01_results_bulk_exact.csv";
pub const BULK_HLL_FILE: &str = "01_results_bulk_hll.csv";
pub const STORAGE_FILE: &str = "02_results_storage.csv";
pub const HASHING_FILE: &str = "03_results_hashing.csv";

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the harness output (trial CSVs, pgbench summaries).
    pub input_dir: PathBuf,
    /// Destination for derived tables and chart series.
    pub output_dir: PathBuf,
    /// File name of the approximate-method (sketch union) trials CSV.
    pub union_file: String,
    /// File name of the exact-method trials CSV.
    pub exact_file: String,
}

impl RunConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> RunConfig {
        RunConfig {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            union_file: DEFAULT_UNION_FILE.to_string(),
            exact_file: DEFAULT_EXACT_FILE.to_string(),
        }
    }

    pub fn union_path(&self) -> PathBuf {
        self.input_dir.join(&self.union_file)
    }

    pub fn exact_path(&self) -> PathBuf {
        self.input_dir.join(&self.exact_file)
    }

    pub fn bulk_exact_path(&self) -> PathBuf {
        self.input_dir.join(BULK_EXACT_FILE)
    }

    pub fn bulk_hll_path(&self) -> PathBuf {
        self.input_dir.join(BULK_HLL_FILE)
    }

    pub fn storage_path(&self) -> PathBuf {
        self.input_dir.join(STORAGE_FILE)
    }

    pub fn hashing_path(&self) -> PathBuf {
        self.input_dir.join(HASHING_FILE)
    }

    /// The persisted joined comparison table.
    pub fn comparison_path(&self) -> PathBuf {
        self.output_dir.join(COMPARISON_FILE)
    }

    /// Directory for per-chart data series.
    pub fn series_dir(&self) -> PathBuf {
        self.output_dir.join("series")
    }

    pub fn series_path(&self, name: &str) -> PathBuf {
        self.series_dir().join(name)
    }

    /// Default output location when the caller gives none: an `analysis`
    /// subdirectory next to the inputs.
    pub fn with_default_output(input_dir: impl Into<PathBuf>) -> RunConfig {
        let input_dir: PathBuf = input_dir.into();
        let output_dir = input_dir.join("analysis");
        RunConfig::new(input_dir, output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_join_under_the_right_roots() {
        let config = RunConfig::new("/data/run1", "/data/run1/out");
        assert_eq!(
            config.union_path(),
            PathBuf::from("/data/run1/union_detailed.csv")
        );
        assert_eq!(
            config.comparison_path(),
            PathBuf::from("/data/run1/out/comparison.csv")
        );
        assert_eq!(
            config.series_path("speedup_by_window.csv"),
            PathBuf::from("/data/run1/out/series/speedup_by_window.csv")
        );
    }

    #[test]
    fn default_output_is_analysis_subdir() {
        let config = RunConfig::with_default_output("/data/run1");
        assert_eq!(config.output_dir, PathBuf::from("/data/run1/analysis"));
    }
}
