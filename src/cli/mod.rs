//! Command-line parsing for the sensor curve fitter.
//!
//! Argument parsing and command dispatch stay separate from the
//! reshaping/fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{ModelSet, TimeUnit};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sensorfit", version, about = "Nested nonlinear model fits for wide sensor tables")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML config file (defaults to $SENSORFIT_CONFIG if set).
    #[arg(long, value_name = "TOML", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reshape, nest and fit every model to every sensor; print and export results.
    Fit(FitArgs),
    /// List the available models, formulas and initial guesses.
    Models,
    /// Write a synthetic wide sensor CSV.
    Generate(GenerateArgs),
}

/// Options for `sensorfit fit`.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Wide input CSV.
    #[arg(short, long, value_name = "CSV")]
    pub input: PathBuf,

    /// Name of the time column.
    #[arg(long)]
    pub time_column: Option<String>,

    /// Prefix shared by all sensor columns (stripped to form sensor ids).
    #[arg(long)]
    pub prefix: Option<String>,

    /// Unit for elapsed time.
    #[arg(long, value_enum)]
    pub unit: Option<TimeUnit>,

    /// Which model(s) to fit.
    #[arg(long, value_enum)]
    pub model: Option<ModelSet>,

    /// Maximum solver iterations per fit.
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Also pick the best model per sensor by BIC.
    #[arg(long)]
    pub best: bool,

    /// Export unnested predictions/residuals to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_flat: Option<PathBuf>,

    /// Export coefficients (one row per parameter) to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_coef: Option<PathBuf>,

    /// Export coefficients pivoted to one row per (model, sensor).
    #[arg(long, value_name = "CSV")]
    pub export_pivot: Option<PathBuf>,

    /// Export the run report (quality, coefficients, failures) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for `sensorfit generate`.
#[derive(Debug, Parser, Clone)]
pub struct GenerateArgs {
    /// Output CSV path.
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,

    /// Number of relaxing sensors.
    #[arg(long, default_value_t = 3)]
    pub sensors: usize,

    /// Readings per sensor.
    #[arg(long, default_value_t = 48)]
    pub readings: usize,

    /// Minutes between readings.
    #[arg(long, default_value_t = 15)]
    pub interval: i64,

    /// First timestamp.
    #[arg(long, default_value = "2024-01-01 00:00:00")]
    pub start: String,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Reading noise standard deviation.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    /// Probability that a reading is missing.
    #[arg(long, default_value_t = 0.0)]
    pub gaps: f64,

    /// Append a constant sensor.
    #[arg(long)]
    pub flat: bool,

    /// Sensor column prefix (defaults to the configured prefix).
    #[arg(long)]
    pub prefix: Option<String>,
}
