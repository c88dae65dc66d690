//! Tagged metric values.
//!
//! A derived ratio is either a number or mathematically undefined for its
//! row (zero denominator). Keeping the distinction explicit stops a zero
//! denominator from leaking into summaries as 0, infinity, or NaN.

/// A derived metric value: a real number, or undefined for this row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    /// The metric's denominator was zero; no numeric value exists.
    Degenerate,
}

impl Metric {
    /// Build a ratio metric. A zero denominator yields `Degenerate`.
    pub fn ratio(numerator: f64, denominator: f64) -> Metric {
        if denominator == 0.0 {
            Metric::Degenerate
        } else {
            Metric::Value(numerator / denominator)
        }
    }

    /// The numeric value, or `None` when degenerate.
    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Degenerate => None,
        }
    }

    pub fn is_degenerate(self) -> bool {
        matches!(self, Metric::Degenerate)
    }

    /// Apply `f` to the numeric value; degenerate stays degenerate.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Metric {
        match self {
            Metric::Value(v) => Metric::Value(f(v)),
            Metric::Degenerate => Metric::Degenerate,
        }
    }
}
