//! Synthetic wide sensor tables.
//!
//! Each sensor follows an exponential relaxation from a random baseline toward
//! `baseline + amplitude` with time constant `tau`, plus Gaussian noise. An
//! optional constant sensor is appended; it is a useful negative case for
//! the erfc models.

use chrono::{Duration, NaiveDateTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{WideRow, WideTable};
use crate::error::{AppError, EXIT_INPUT};

const MAX_READINGS: usize = 1_000_000;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub sensors: usize,
    pub readings: usize,
    pub interval_minutes: i64,
    pub start: NaiveDateTime,
    pub prefix: String,
    pub seed: u64,
    /// Standard deviation of the reading noise (degrees).
    pub noise_sd: f64,
    /// Probability that any single reading is missing.
    pub gap_prob: f64,
    /// Append a sensor whose readings never change.
    pub flat_sensor: bool,
}

/// Ground truth used to generate one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTruth {
    pub column: String,
    pub baseline: f64,
    pub amplitude: f64,
    /// Time constant in hours.
    pub tau: f64,
}

#[derive(Debug, Clone)]
pub struct SampleData {
    pub table: WideTable,
    pub truth: Vec<SensorTruth>,
}

pub fn generate_wide(config: &SampleConfig) -> Result<SampleData, AppError> {
    if config.sensors == 0 && !config.flat_sensor {
        return Err(AppError::new(EXIT_INPUT, "Sensor count must be > 0."));
    }
    if config.readings < 2 {
        return Err(AppError::new(EXIT_INPUT, "Need at least 2 readings per sensor."));
    }
    if config.interval_minutes <= 0 {
        return Err(AppError::new(EXIT_INPUT, "Reading interval must be > 0 minutes."));
    }
    if !(0.0..1.0).contains(&config.gap_prob) {
        return Err(AppError::new(EXIT_INPUT, "Gap probability must be in [0, 1)."));
    }
    if config.readings > MAX_READINGS {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("At most {MAX_READINGS} readings per sensor are supported."),
        ));
    }
    // Every later timestamp is bounded by the last one.
    reading_time(config, config.readings - 1)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sd.max(0.0))
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Noise distribution error: {e}")))?;

    let mut truth = Vec::with_capacity(config.sensors + 1);
    for i in 0..config.sensors {
        truth.push(SensorTruth {
            column: format!("{}{}", config.prefix, sensor_name(i)),
            baseline: rng.gen_range(5.0..25.0),
            amplitude: rng.gen_range(2.0..12.0),
            tau: rng.gen_range(0.5..4.0),
        });
    }
    if config.flat_sensor {
        truth.push(SensorTruth {
            column: format!("{}flat", config.prefix),
            baseline: rng.gen_range(5.0..25.0),
            amplitude: 0.0,
            tau: 1.0,
        });
    }

    let mut rows = Vec::with_capacity(config.readings);
    for r in 0..config.readings {
        let time = reading_time(config, r)?;
        let hours = (time - config.start).num_minutes() as f64 / 60.0;

        let values = truth
            .iter()
            .map(|s| {
                let is_flat = s.amplitude == 0.0;
                // The first reading is always present so every sensor has an origin.
                if r > 0 && !is_flat && rng.gen_bool(config.gap_prob) {
                    return None;
                }
                let level = s.baseline + s.amplitude * (1.0 - (-hours / s.tau).exp());
                let jitter = if is_flat { 0.0 } else { noise.sample(&mut rng) };
                Some(level + jitter)
            })
            .collect();

        rows.push(WideRow { time, values });
    }

    Ok(SampleData {
        table: WideTable {
            time_column: "time".to_string(),
            sensor_columns: truth.iter().map(|s| s.column.clone()).collect(),
            rows,
        },
        truth,
    })
}

/// Timestamp of reading `r`, or an input error if it leaves chrono's range.
fn reading_time(config: &SampleConfig, r: usize) -> Result<NaiveDateTime, AppError> {
    i64::try_from(r)
        .ok()
        .and_then(|r| config.interval_minutes.checked_mul(r))
        .and_then(Duration::try_minutes)
        .and_then(|offset| config.start.checked_add_signed(offset))
        .ok_or_else(|| {
            AppError::new(
                EXIT_INPUT,
                format!(
                    "{} readings every {} minutes run past the last representable timestamp.",
                    config.readings, config.interval_minutes
                ),
            )
        })
}

/// `a`, `b`, …, `z`, `s26`, `s27`, …
fn sensor_name(i: usize) -> String {
    if i < 26 {
        ((b'a' + i as u8) as char).to_string()
    } else {
        format!("s{i}")
    }
}
