//! Wide -> long reshaping and per-group deltas.
//!
//! `pivot_longer` only changes layout: one output row per (time, sensor) cell,
//! gaps included. `compute_deltas` is where gaps are dropped and each sensor's
//! readings are re-expressed relative to its first reading.

use tracing::debug;

use crate::domain::{LongRow, LongTable, Observation, TimeUnit, WideTable};

/// Sensor id for a column: the column name with `prefix` stripped.
///
/// Columns without the prefix keep their full name.
pub fn sensor_id(column: &str, prefix: &str) -> String {
    column.strip_prefix(prefix).unwrap_or(column).to_string()
}

/// Stack the sensor columns of `wide` into `(time, sensor_id, value)` rows.
///
/// Output is row-major: all sensors of the first input row, then the second row, …
///
/// Every `WideRow` must hold exactly one value slot per sensor column, as
/// `io::ingest` guarantees.
pub fn pivot_longer(wide: &WideTable, prefix: &str) -> LongTable {
    let ids: Vec<String> = wide.sensor_columns.iter().map(|c| sensor_id(c, prefix)).collect();
    let mut rows = Vec::with_capacity(wide.rows.len() * ids.len());

    for row in &wide.rows {
        debug_assert_eq!(row.values.len(), ids.len(), "wide row at {} is ragged", row.time);
        for (id, value) in ids.iter().zip(&row.values) {
            rows.push(LongRow {
                time: row.time,
                sensor_id: id.clone(),
                value: *value,
            });
        }
    }

    LongTable { rows }
}

/// Drop gaps, sort by `(sensor_id, time)` and compute elapsed time and delta
/// relative to each sensor's first remaining reading.
pub fn compute_deltas(long: &LongTable, unit: TimeUnit) -> Vec<Observation> {
    let mut complete: Vec<&LongRow> = long.rows.iter().filter(|r| r.value.is_some()).collect();
    let gaps = long.rows.len() - complete.len();
    if gaps > 0 {
        debug!(gaps, "dropped missing readings");
    }

    // Stable sort keeps input order for duplicate timestamps.
    complete.sort_by(|a, b| a.sensor_id.cmp(&b.sensor_id).then(a.time.cmp(&b.time)));

    let mut out = Vec::with_capacity(complete.len());
    let mut first: Option<(&str, chrono::NaiveDateTime, f64)> = None;

    for row in complete {
        let Some(value) = row.value else { continue };
        let (t0, v0) = match first {
            Some((id, t0, v0)) if id == row.sensor_id => (t0, v0),
            _ => {
                first = Some((row.sensor_id.as_str(), row.time, value));
                (row.time, value)
            }
        };

        let seconds = (row.time - t0).num_milliseconds() as f64 / 1_000.0;
        out.push(Observation {
            group_id: row.sensor_id.clone(),
            time: row.time,
            value,
            elapsed: seconds / unit.seconds(),
            delta: value - v0,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WideRow;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashSet;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn wide() -> WideTable {
        WideTable {
            time_column: "time".to_string(),
            sensor_columns: vec![
                "temperature_s1".to_string(),
                "temperature_s2".to_string(),
                "temperature_s3".to_string(),
            ],
            rows: vec![
                WideRow {
                    time: ts(10, 0),
                    values: vec![Some(20.0), Some(18.5), None],
                },
                WideRow {
                    time: ts(10, 30),
                    values: vec![Some(21.0), Some(19.0), Some(17.0)],
                },
                WideRow {
                    time: ts(11, 0),
                    values: vec![Some(22.5), Some(19.25), Some(17.5)],
                },
            ],
        }
    }

    #[test]
    fn long_table_is_cross_product_of_times_and_sensors() {
        let w = wide();
        let long = pivot_longer(&w, "temperature_");
        assert_eq!(long.rows.len(), w.rows.len() * w.sensor_columns.len());

        let pairs: HashSet<(NaiveDateTime, String)> =
            long.rows.iter().map(|r| (r.time, r.sensor_id.clone())).collect();
        let mut expected = HashSet::new();
        for row in &w.rows {
            for id in ["s1", "s2", "s3"] {
                expected.insert((row.time, id.to_string()));
            }
        }
        assert_eq!(pairs, expected);
    }

    #[test]
    fn values_are_not_altered() {
        let long = pivot_longer(&wide(), "temperature_");
        assert_eq!(long.rows[0].value, Some(20.0));
        assert_eq!(long.rows[2].value, None);
        assert_eq!(long.rows[8].value, Some(17.5));
        assert_eq!(long.rows[8].sensor_id, "s3");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "ragged")]
    fn ragged_wide_row_is_rejected() {
        let mut w = wide();
        w.rows[1].values.pop();
        pivot_longer(&w, "temperature_");
    }

    #[test]
    fn unprefixed_columns_keep_their_name() {
        assert_eq!(sensor_id("humidity_7", "temperature_"), "humidity_7");
        assert_eq!(sensor_id("temperature_x", "temperature_"), "x");
    }

    #[test]
    fn first_row_of_each_group_is_zero() {
        let obs = compute_deltas(&pivot_longer(&wide(), "temperature_"), TimeUnit::Hours);
        let mut seen = HashSet::new();
        for o in &obs {
            if seen.insert(o.group_id.clone()) {
                assert_eq!(o.elapsed, 0.0, "group {}", o.group_id);
                assert_eq!(o.delta, 0.0, "group {}", o.group_id);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn deltas_are_relative_to_first_reading() {
        let obs = compute_deltas(&pivot_longer(&wide(), "temperature_"), TimeUnit::Minutes);
        let s1: Vec<&Observation> = obs.iter().filter(|o| o.group_id == "s1").collect();
        assert_eq!(s1.len(), 3);
        assert_eq!(s1[2].elapsed, 60.0);
        assert!((s1[2].delta - 2.5).abs() < 1e-12);

        // s3 starts at its first non-missing reading.
        let s3: Vec<&Observation> = obs.iter().filter(|o| o.group_id == "s3").collect();
        assert_eq!(s3.len(), 2);
        assert_eq!(s3[0].time, ts(10, 30));
        assert!((s3[1].delta - 0.5).abs() < 1e-12);
    }

    #[test]
    fn output_is_sorted_by_group_then_time() {
        let mut w = wide();
        w.rows.reverse();
        let obs = compute_deltas(&pivot_longer(&w, "temperature_"), TimeUnit::Hours);
        for pair in obs.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.group_id < b.group_id || (a.group_id == b.group_id && a.time <= b.time));
            if a.group_id == b.group_id {
                assert!(a.elapsed <= b.elapsed);
            }
        }
    }

    #[test]
    fn single_row_group_is_zero() {
        let w = WideTable {
            time_column: "time".to_string(),
            sensor_columns: vec!["temperature_only".to_string()],
            rows: vec![WideRow {
                time: ts(9, 0),
                values: vec![Some(12.0)],
            }],
        };
        let obs = compute_deltas(&pivot_longer(&w, "temperature_"), TimeUnit::Hours);
        assert_eq!(obs.len(), 1);
        assert_eq!((obs[0].elapsed, obs[0].delta), (0.0, 0.0));
    }
}
