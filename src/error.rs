//! Typed pipeline errors.
//!
//! Parsing failures are local and non-fatal (the row or file is skipped
//! with a logged count); structural failures (a whole required source
//! missing, zero usable rows) surface as variants here so the caller can
//! decide which analyses to skip.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading input sources.
#[derive(Debug, Error)]
pub enum IngestError {
    /// An expected input file is absent. Distinct from "zero rows by
    /// design" so the caller can report it and skip only the analyses
    /// that depend on this source.
    #[error("missing input source: {0}")]
    MissingSource(PathBuf),

    /// The source parsed but yielded no usable rows.
    #[error("{path}: no usable rows ({dropped} malformed rows dropped)")]
    EmptyInput { path: PathBuf, dropped: usize },

    /// A required column is absent from the CSV header.
    #[error("{path}: missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: &'static str },

    /// A row in a table we wrote ourselves failed to parse. Malformed
    /// rows in harness input are dropped and counted instead.
    #[error("{path}: malformed row {row}: {detail}")]
    MalformedRow {
        path: PathBuf,
        row: usize,
        detail: String,
    },

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Errors raised by the aggregation stage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// The trial set was empty. Callers decide whether that is fatal.
    #[error("cannot aggregate an empty trial set")]
    EmptyInput,
}
