//! Aggregation, comparison and reporting for HLL-vs-exact cardinality
//! benchmark results.
//!
//! The pipeline is a single forward pass over in-memory data:
//! ingestion → aggregation (per method) → comparison join → summary
//! reduction, with a persisted comparison table and chart-ready CSV
//! series as outputs. Every stage is a pure function of its inputs, so
//! stages are independently testable and trivially re-runnable.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metric;
pub mod record;
pub mod report;
pub mod summary;
pub mod table;
