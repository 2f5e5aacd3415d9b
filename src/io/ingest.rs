//! CSV ingest for wide sensor tables.
//!
//! Turns a CSV with one time column and one column per sensor into a
//! `WideTable`. Layout is not changed here; reshaping happens in `tidy`.
//!
//! Rules:
//! - header names are trimmed and a UTF-8 BOM on the first header is stripped
//! - sensor columns are the headers starting with the configured prefix
//! - empty cells and `NA`/`NaN` are gaps
//! - any other unparseable time or value is fatal, with the CSV line number

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::{WideRow, WideTable};
use crate::error::{AppError, EXIT_DATA};

/// Accepted timestamp layouts, tried in order after RFC 3339.
const TIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Load a wide CSV from disk.
pub fn load_wide(path: &Path, time_column: &str, prefix: &str) -> Result<WideTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let table = read_wide(file, time_column, prefix)?;
    info!(
        path = %path.display(),
        rows = table.rows.len(),
        sensors = table.sensor_columns.len(),
        "loaded wide table"
    );
    Ok(table)
}

/// Read a wide CSV from any reader.
pub fn read_wide<R: Read>(reader: R, time_column: &str, prefix: &str) -> Result<WideTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let time_idx = *header_map
        .get(time_column)
        .ok_or_else(|| AppError::input(format!("Missing required time column: `{time_column}`")))?;

    let mut sensor_idx = Vec::new();
    let mut sensor_columns = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        let name = normalize_header_name(name);
        if idx == time_idx {
            continue;
        }
        if name.starts_with(prefix) {
            sensor_idx.push(idx);
            sensor_columns.push(name);
        } else {
            debug!(column = %name, "ignoring non-sensor column");
        }
    }
    if sensor_columns.is_empty() {
        return Err(AppError::input(format!(
            "No sensor columns found with prefix `{prefix}`."
        )));
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::input(format!("CSV parse error on line {line}: {e}")))?;

        let raw_time = record.get(time_idx).unwrap_or("");
        let time = parse_time(raw_time)
            .ok_or_else(|| AppError::input(format!("Line {line}: invalid time value `{raw_time}`")))?;

        let mut values = Vec::with_capacity(sensor_idx.len());
        for (&col, name) in sensor_idx.iter().zip(&sensor_columns) {
            let raw = record.get(col).unwrap_or("");
            let value = parse_value(raw).map_err(|_| {
                AppError::input(format!("Line {line}: invalid value `{raw}` in column `{name}`"))
            })?;
            values.push(value);
        }

        rows.push(WideRow { time, values });
    }

    if rows.is_empty() {
        return Err(AppError::new(EXIT_DATA, "CSV contains a header but no data rows."));
    }

    Ok(WideTable {
        time_column: time_column.to_string(),
        sensor_columns,
        rows,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Parse a timestamp in any accepted layout. Date-only values map to midnight.
pub fn parse_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a sensor reading; `Ok(None)` for a gap.
pub fn parse_value(s: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let v: f64 = s.parse()?;
    Ok(if v.is_finite() { Some(v) } else { None })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\u{feff}time,temperature_a,temperature_b,note\n\
2024-02-01 08:00:00,10.0,11.5,x\n\
2024-02-01 08:30:00,,12.0,y\n\
2024-02-01T09:00:00,10.75,NA,z\n";

    #[test]
    fn reads_sensor_columns_and_gaps() {
        let t = read_wide(CSV.as_bytes(), "time", "temperature_").unwrap();
        assert_eq!(t.sensor_columns, vec!["temperature_a", "temperature_b"]);
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[0].values, vec![Some(10.0), Some(11.5)]);
        assert_eq!(t.rows[1].values, vec![None, Some(12.0)]);
        assert_eq!(t.rows[2].values, vec![Some(10.75), None]);
    }

    #[test]
    fn missing_time_column_is_fatal() {
        let err = read_wide(CSV.as_bytes(), "timestamp", "temperature_").unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn no_prefixed_columns_is_fatal() {
        let err = read_wide(CSV.as_bytes(), "time", "humidity_").unwrap_err();
        assert!(err.to_string().contains("humidity_"));
    }

    #[test]
    fn bad_value_reports_line_number() {
        let csv = "time,temperature_a\n2024-01-01 00:00:00,1.0\n2024-01-01 01:00:00,warm\n";
        let err = read_wide(csv.as_bytes(), "time", "temperature_").unwrap_err();
        assert!(err.to_string().contains("Line 3"), "{err}");
    }

    #[test]
    fn bad_time_is_fatal() {
        let csv = "time,temperature_a\nyesterday,1.0\n";
        let err = read_wide(csv.as_bytes(), "time", "temperature_").unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn parses_supported_time_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 0)
            .unwrap();
        for s in [
            "2024-05-06 07:08:00",
            "2024-05-06T07:08:00",
            "2024-05-06 07:08",
            "06/05/2024 07:08",
            "2024-05-06T07:08:00Z",
            "2024-05-06T09:08:00+02:00",
        ] {
            assert_eq!(parse_time(s), Some(expected), "layout {s}");
        }
        assert!(parse_time("2024-05-06").is_some());
    }

    #[test]
    fn header_only_is_insufficient_data() {
        let err = read_wide("time,temperature_a\n".as_bytes(), "time", "temperature_").unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);
    }
}
