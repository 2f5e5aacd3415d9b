//! Export result tables to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts: one header row, one record per result row.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{CoefRow, FlatRow, WideTable};
use crate::error::{AppError, EXIT_COMPUTE};
use crate::report::CoefPivot;

/// Write any serializable rows as CSV with a header.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(writer);
    for row in rows {
        w.serialize(row)
            .map_err(|e| AppError::new(EXIT_COMPUTE, format!("Failed to write CSV row: {e}")))?;
    }
    w.flush()
        .map_err(|e| AppError::new(EXIT_COMPUTE, format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

/// Write the pivoted coefficient table: `model,sensor,<param...>`.
pub fn write_pivot<W: Write>(writer: W, pivot: &CoefPivot) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(writer);
    let map_err = |e: csv::Error| AppError::new(EXIT_COMPUTE, format!("Failed to write pivot CSV: {e}"));

    let mut header = vec!["model_id".to_string(), "group_id".to_string()];
    header.extend(pivot.params.iter().cloned());
    w.write_record(&header).map_err(map_err)?;

    for (model, group, cells) in &pivot.rows {
        let mut record = vec![model.clone(), group.clone()];
        record.extend(cells.iter().map(|c| c.map(|v| v.to_string()).unwrap_or_default()));
        w.write_record(&record).map_err(map_err)?;
    }
    w.flush()
        .map_err(|e| AppError::new(EXIT_COMPUTE, format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

/// Write a wide table back out: time column first, then sensor columns.
///
/// Gaps are written as empty cells.
pub fn write_wide<W: Write>(writer: W, table: &WideTable) -> Result<(), AppError> {
    let mut w = csv::Writer::from_writer(writer);
    let map_err = |e: csv::Error| AppError::new(EXIT_COMPUTE, format!("Failed to write wide CSV: {e}"));

    let mut header = vec![table.time_column.clone()];
    header.extend(table.sensor_columns.iter().cloned());
    w.write_record(&header).map_err(map_err)?;

    for row in &table.rows {
        let mut record = vec![row.time.format("%Y-%m-%d %H:%M:%S").to_string()];
        record.extend(row.values.iter().map(|v| v.map(|x| format!("{x:.4}")).unwrap_or_default()));
        w.write_record(&record).map_err(map_err)?;
    }
    w.flush()
        .map_err(|e| AppError::new(EXIT_COMPUTE, format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_wide_csv(path: &Path, table: &WideTable) -> Result<(), AppError> {
    write_wide(create(path)?, table)
}

pub fn write_flat_csv(path: &Path, rows: &[FlatRow]) -> Result<(), AppError> {
    write_rows(create(path)?, rows)
}

pub fn write_coefficients_csv(path: &Path, rows: &[CoefRow]) -> Result<(), AppError> {
    write_rows(create(path)?, rows)
}

pub fn write_pivot_csv(path: &Path, pivot: &CoefPivot) -> Result<(), AppError> {
    write_pivot(create(path)?, pivot)
}

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path).map_err(|e| {
        AppError::new(
            EXIT_COMPUTE,
            format!("Failed to create export '{}': {e}", path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_rows_have_header_and_one_line_each() {
        let rows = vec![
            FlatRow {
                model_id: "exponential".to_string(),
                group_id: "s1".to_string(),
                elapsed: 0.5,
                measured: 1.25,
                predicted: 1.0,
                residual: 0.25,
            },
            FlatRow {
                model_id: "exponential".to_string(),
                group_id: "s1".to_string(),
                elapsed: 1.0,
                measured: 2.0,
                predicted: 2.5,
                residual: -0.5,
            },
        ];
        let mut buf = Vec::new();
        write_rows(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "model_id,group_id,elapsed,measured,predicted,residual");
        assert_eq!(lines[1], "exponential,s1,0.5,1.25,1.0,0.25");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn wide_table_round_trips_through_ingest() {
        use crate::domain::WideRow;
        use chrono::NaiveDate;

        let t0 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();
        let table = WideTable {
            time_column: "time".to_string(),
            sensor_columns: vec!["temperature_a".to_string(), "temperature_b".to_string()],
            rows: vec![
                WideRow { time: t0, values: vec![Some(1.5), None] },
                WideRow { time: t0 + chrono::Duration::hours(1), values: vec![Some(2.25), Some(3.0)] },
            ],
        };
        let mut buf = Vec::new();
        write_wide(&mut buf, &table).unwrap();
        let back = crate::io::ingest::read_wide(buf.as_slice(), "time", "temperature_").unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn pivot_leaves_missing_cells_empty() {
        let pivot = CoefPivot {
            params: vec!["a".to_string(), "tau".to_string(), "b".to_string()],
            rows: vec![("diffusion".to_string(), "s2".to_string(), vec![Some(2.0), None, Some(0.5)])],
        };
        let mut buf = Vec::new();
        write_pivot(&mut buf, &pivot).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "model_id,group_id,a,tau,b");
        assert_eq!(lines[1], "diffusion,s2,2,,0.5");
    }
}
