//! Raw trial records as the benchmark harness writes them.
//!
//! Field names match the harness CSV headers exactly; rows deserialize
//! straight off the `csv` reader. Records are immutable once loaded.

use serde::Deserialize;

/// Measurements must be finite: `f64` parsing accepts "NaN" and "inf",
/// and `< 0.0` alone lets both through.
fn finite_nonnegative(value: f64, reason: &'static str) -> Result<(), &'static str> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(reason)
    }
}

/// One executed HLL sketch-union trial (approximate method).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnionTrial {
    pub precision: u32,
    pub num_days: u32,
    pub estimated_count: f64,
    pub query_time_ms: f64,
    pub total_sketch_size_bytes: u64,
    pub run_number: u32,
}

impl UnionTrial {
    /// Range checks beyond what deserialization enforces. Returns the
    /// reason a row should be dropped, if any.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.num_days == 0 {
            return Err("num_days must be positive");
        }
        finite_nonnegative(
            self.estimated_count,
            "estimated_count must be a finite non-negative number",
        )?;
        finite_nonnegative(
            self.query_time_ms,
            "query_time_ms must be a finite non-negative number",
        )
    }
}

/// One executed exact `COUNT(DISTINCT)` trial.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExactTrial {
    pub num_days: u32,
    pub exact_count: f64,
    pub query_time_ms: f64,
    pub run_number: u32,
}

impl ExactTrial {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.num_days == 0 {
            return Err("num_days must be positive");
        }
        finite_nonnegative(
            self.exact_count,
            "exact_count must be a finite non-negative number",
        )?;
        finite_nonnegative(
            self.query_time_ms,
            "query_time_ms must be a finite non-negative number",
        )
    }
}

/// One bulk-aggregation trial using the exact `COUNT(DISTINCT)` baseline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BulkExactTrial {
    pub duration_ms: f64,
}

impl BulkExactTrial {
    pub fn validate(&self) -> Result<(), &'static str> {
        finite_nonnegative(
            self.duration_ms,
            "duration_ms must be a finite non-negative number",
        )
    }
}

/// One bulk-aggregation trial for an HLL variant; `relative_error` is
/// already a percentage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BulkHllTrial {
    pub test_name: String,
    pub duration_ms: f64,
    pub relative_error: f64,
}

impl BulkHllTrial {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.test_name.is_empty() {
            return Err("test_name must be non-empty");
        }
        finite_nonnegative(
            self.duration_ms,
            "duration_ms must be a finite non-negative number",
        )?;
        finite_nonnegative(
            self.relative_error,
            "relative_error must be a finite non-negative number",
        )
    }
}

/// One storage-footprint sample: bytes used by one HLL variant after
/// adding `item_count` distinct items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageSample {
    pub hll_type: String,
    pub item_count: u64,
    pub storage_bytes: u64,
}

impl StorageSample {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.hll_type.is_empty() {
            return Err("hll_type must be non-empty");
        }
        Ok(())
    }
}

/// One hash-function overhead trial.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HashingTrial {
    pub test_name: String,
    pub duration_ms: f64,
}

impl HashingTrial {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.test_name.is_empty() {
            return Err("test_name must be non-empty");
        }
        finite_nonnegative(
            self.duration_ms,
            "duration_ms must be a finite non-negative number",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn union_trial() -> UnionTrial {
        UnionTrial {
            precision: 12,
            num_days: 7,
            estimated_count: 9987.0,
            query_time_ms: 0.55,
            total_sketch_size_bytes: 5120,
            run_number: 1,
        }
    }

    #[test]
    fn valid_union_trial_passes() {
        assert!(union_trial().validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut t = union_trial();
        t.num_days = 0;
        assert!(t.validate().is_err());
    }

    #[test]
    fn negative_time_is_rejected() {
        let mut t = union_trial();
        t.query_time_ms = -0.1;
        assert!(t.validate().is_err());

        let e = ExactTrial {
            num_days: 7,
            exact_count: 100.0,
            query_time_ms: -1.0,
            run_number: 1,
        };
        assert!(e.validate().is_err());
    }

    #[test]
    fn nonfinite_values_are_rejected() {
        // `f64` parses the strings "NaN" and "inf", so the range checks
        // must catch non-finite values, not just negatives.
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut t = union_trial();
            t.estimated_count = bad;
            assert!(t.validate().is_err(), "estimated_count = {bad}");

            let mut t = union_trial();
            t.query_time_ms = bad;
            assert!(t.validate().is_err(), "query_time_ms = {bad}");

            let e = ExactTrial {
                num_days: 7,
                exact_count: bad,
                query_time_ms: 50.0,
                run_number: 1,
            };
            assert!(e.validate().is_err(), "exact_count = {bad}");

            let h = HashingTrial {
                test_name: "hash_bigint".to_string(),
                duration_ms: bad,
            };
            assert!(h.validate().is_err(), "duration_ms = {bad}");
        }
    }

    #[test]
    fn bulk_hll_trial_checks_name_and_ranges() {
        let good = BulkHllTrial {
            test_name: "hll_p12".to_string(),
            duration_ms: 45.2,
            relative_error: 0.51,
        };
        assert!(good.validate().is_ok());

        let mut bad = good.clone();
        bad.test_name = String::new();
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.relative_error = f64::NAN;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn zero_time_and_zero_count_are_valid() {
        // Zero is in range; the comparator tags the resulting degenerate
        // ratios, ingestion does not reject the rows.
        let mut t = union_trial();
        t.query_time_ms = 0.0;
        t.estimated_count = 0.0;
        assert!(t.validate().is_ok());

        let e = ExactTrial {
            num_days: 7,
            exact_count: 0.0,
            query_time_ms: 0.0,
            run_number: 1,
        };
        assert!(e.validate().is_ok());
    }
}
