//! Persistence for the joined comparison table.
//!
//! Writes `comparison.csv` for downstream reporting and reads it back.
//! Floats are written in ryu shortest form, which parses back to the
//! identical bit pattern, so a round trip reproduces every numeric field
//! exactly. Degenerate metrics serialize as an empty field.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use crate::compare::ComparisonRow;
use crate::error::IngestError;
use crate::metric::Metric;

const HEADERS: [&str; 11] = [
    "precision",
    "num_days",
    "avg_estimate",
    "exact_count",
    "union_time_ms",
    "exact_time_ms",
    "error_absolute",
    "error_pct",
    "speedup_factor",
    "sketch_size_kb",
    "efficiency_score",
];

/// Write the comparison table to `path`, creating parent dirs as needed.
pub fn write_comparison(path: &Path, rows: &[ComparisonRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_to(file, rows).with_context(|| format!("failed to write {}", path.display()))
}

/// Read a comparison table previously written by [`write_comparison`].
pub fn read_comparison(path: &Path) -> Result<Vec<ComparisonRow>, IngestError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            IngestError::MissingSource(path.to_path_buf())
        } else {
            IngestError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    read_from(file, path)
}

fn write_to<W: io::Write>(sink: W, rows: &[ComparisonRow]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(sink);
    wtr.write_record(HEADERS)?;
    let mut buf = ryu::Buffer::new();
    for row in rows {
        let record = [
            row.precision.to_string(),
            row.num_days.to_string(),
            buf.format(row.avg_estimate).to_string(),
            buf.format(row.exact_count).to_string(),
            buf.format(row.union_time_ms).to_string(),
            buf.format(row.exact_time_ms).to_string(),
            buf.format(row.error_absolute).to_string(),
            fmt_metric(&mut buf, row.error_pct),
            fmt_metric(&mut buf, row.speedup_factor),
            buf.format(row.sketch_size_kb).to_string(),
            fmt_metric(&mut buf, row.efficiency_score),
        ];
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn fmt_metric(buf: &mut ryu::Buffer, metric: Metric) -> String {
    match metric {
        Metric::Value(v) => buf.format(v).to_string(),
        Metric::Degenerate => String::new(),
    }
}

fn read_from<R: io::Read>(source: R, path: &Path) -> Result<Vec<ComparisonRow>, IngestError> {
    let mut rdr = csv::Reader::from_reader(source);
    let headers = rdr
        .headers()
        .map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?
        .clone();
    for column in HEADERS {
        if !headers.iter().any(|h| h == column) {
            return Err(IngestError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        // Header is line 1, first data row is line 2.
        let line = i + 2;
        let record = result.map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        rows.push(parse_row(&record, &headers).map_err(|detail| IngestError::MalformedRow {
            path: path.to_path_buf(),
            row: line,
            detail,
        })?);
    }
    Ok(rows)
}

fn parse_row(
    record: &csv::StringRecord,
    headers: &csv::StringRecord,
) -> Result<ComparisonRow, String> {
    let field = |name: &str| -> Result<&str, String> {
        let idx = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| format!("missing column `{name}`"))?;
        record
            .get(idx)
            .ok_or_else(|| format!("missing field `{name}`"))
    };
    let f64_field = |name: &str| -> Result<f64, String> {
        let raw = field(name)?;
        raw.parse::<f64>()
            .map_err(|e| format!("bad `{name}` value {raw:?}: {e}"))
    };
    let u32_field = |name: &str| -> Result<u32, String> {
        let raw = field(name)?;
        raw.parse::<u32>()
            .map_err(|e| format!("bad `{name}` value {raw:?}: {e}"))
    };
    let metric_field = |name: &str| -> Result<Metric, String> {
        let raw = field(name)?;
        if raw.is_empty() {
            Ok(Metric::Degenerate)
        } else {
            raw.parse::<f64>()
                .map(Metric::Value)
                .map_err(|e| format!("bad `{name}` value {raw:?}: {e}"))
        }
    };

    Ok(ComparisonRow {
        precision: u32_field("precision")?,
        num_days: u32_field("num_days")?,
        avg_estimate: f64_field("avg_estimate")?,
        exact_count: f64_field("exact_count")?,
        union_time_ms: f64_field("union_time_ms")?,
        exact_time_ms: f64_field("exact_time_ms")?,
        error_absolute: f64_field("error_absolute")?,
        error_pct: metric_field("error_pct")?,
        speedup_factor: metric_field("speedup_factor")?,
        sketch_size_kb: f64_field("sketch_size_kb")?,
        efficiency_score: metric_field("efficiency_score")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_row() -> ComparisonRow {
        ComparisonRow {
            precision: 12,
            num_days: 7,
            avg_estimate: 9_987.3,
            exact_count: 10_000.0,
            union_time_ms: 0.55,
            exact_time_ms: 51.0,
            error_absolute: 12.7,
            error_pct: Metric::Value(0.127),
            speedup_factor: Metric::Value(51.0 / 0.55),
            sketch_size_kb: 5.0,
            efficiency_score: Metric::Value((51.0 / 0.55) / 0.127),
        }
    }

    fn round_trip(rows: &[ComparisonRow]) -> Vec<ComparisonRow> {
        let mut buf = Vec::new();
        write_to(&mut buf, rows).unwrap();
        read_from(buf.as_slice(), Path::new("mem.csv")).unwrap()
    }

    #[test]
    fn round_trip_exact() {
        let rows = vec![sample_row()];
        assert_eq!(round_trip(&rows), rows);
    }

    #[test]
    fn degenerate_serializes_as_empty_field() {
        let mut row = sample_row();
        row.error_pct = Metric::Degenerate;
        row.efficiency_score = Metric::Degenerate;

        let mut buf = Vec::new();
        write_to(&mut buf, &[row.clone()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let data_line = text.lines().nth(1).unwrap();
        assert!(data_line.contains(",,"), "expected empty field: {data_line}");

        let back = round_trip(&[row.clone()]);
        assert_eq!(back[0], row);
    }

    #[test]
    fn header_validation() {
        let csv = "precision,num_days\n12,7\n";
        let err = read_from(csv.as_bytes(), Path::new("bad.csv")).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { column, .. }
            if column == "avg_estimate"));
    }

    #[test]
    fn malformed_row_is_an_error_with_line_number() {
        let mut buf = Vec::new();
        write_to(&mut buf, &[sample_row()]).unwrap();
        let mut text = String::from_utf8(buf).unwrap();
        text.push_str("12,7,not_a_number,1,1,1,1,1,1,1,1\n");
        let err = read_from(text.as_bytes(), Path::new("bad.csv")).unwrap_err();
        assert!(matches!(err, IngestError::MalformedRow { row: 3, .. }));
    }

    #[test]
    fn missing_file_is_missing_source() {
        let err = read_comparison(Path::new("/nonexistent/comparison.csv")).unwrap_err();
        assert!(matches!(err, IngestError::MissingSource(_)));
    }

    #[test]
    fn write_and_read_through_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("comparison.csv");
        let rows = vec![sample_row()];
        write_comparison(&path, &rows).unwrap();
        assert_eq!(read_comparison(&path).unwrap(), rows);
    }

    proptest! {
        #[test]
        fn floats_survive_round_trip_bit_for_bit(
            avg_estimate in proptest::num::f64::POSITIVE
                | proptest::num::f64::NORMAL
                | proptest::num::f64::ZERO,
            union_time in proptest::num::f64::POSITIVE
                | proptest::num::f64::NORMAL
                | proptest::num::f64::ZERO,
            exact_time in proptest::num::f64::POSITIVE
                | proptest::num::f64::NORMAL
                | proptest::num::f64::ZERO,
        ) {
            let mut row = sample_row();
            row.avg_estimate = avg_estimate;
            row.union_time_ms = union_time;
            row.exact_time_ms = exact_time;
            let back = round_trip(std::slice::from_ref(&row));
            prop_assert_eq!(back[0].avg_estimate.to_bits(), row.avg_estimate.to_bits());
            prop_assert_eq!(back[0].union_time_ms.to_bits(), row.union_time_ms.to_bits());
            prop_assert_eq!(back[0].exact_time_ms.to_bits(), row.exact_time_ms.to_bits());
        }
    }
}
