//! Top-level application orchestration.
//!
//! `src/main.rs` is tiny; this module is the "real main" that:
//! - loads `.env`, parses CLI arguments and initializes logging
//! - resolves the TOML config and CLI overrides into a `FitConfig`
//! - runs the fit pipeline
//! - prints reports and writes optional exports

use chrono::NaiveDateTime;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::{Cli, Command, FitArgs, GenerateArgs};
use crate::config::Config;
use crate::data::{SampleConfig, generate_wide};
use crate::domain::{FitConfig, ModelKind, SolverOptions};
use crate::error::AppError;
use crate::io::ingest::parse_time;

pub mod pipeline;

/// Entry point for the `sensorfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; it only supplies $SENSORFIT_CONFIG / $RUST_LOG.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref()).map_err(|e| AppError::input(e.to_string()))?;

    match cli.command {
        Command::Fit(args) => handle_fit(&args, &config),
        Command::Models => handle_models(&config),
        Command::Generate(args) => handle_generate(&args, &config),
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: &FitArgs, config: &Config) -> Result<(), AppError> {
    let fit_config = fit_config_from_args(args, config);
    let run = pipeline::run_fit(&fit_config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.grouped, &run.runs, &fit_config)
    );
    if !run.quality.is_empty() {
        println!("{}", crate::report::format_quality(&run.quality));
        println!("{}", crate::report::format_coefficients(&run.pivot));
    }
    if let Some(selection) = &run.selection {
        println!("{}", crate::report::format_selection(selection));
    }

    if let Some(path) = &fit_config.export_flat {
        crate::io::export::write_flat_csv(path, &run.flat)?;
        info!(path = %path.display(), rows = run.flat.len(), "wrote flat results");
    }
    if let Some(path) = &fit_config.export_coefficients {
        crate::io::export::write_coefficients_csv(path, &run.coefficients)?;
        info!(path = %path.display(), rows = run.coefficients.len(), "wrote coefficients");
    }
    if let Some(path) = &fit_config.export_pivot {
        crate::io::export::write_pivot_csv(path, &run.pivot)?;
        info!(path = %path.display(), rows = run.pivot.rows.len(), "wrote pivoted coefficients");
    }
    if let Some(path) = &fit_config.export_json {
        let report = pipeline::build_report(&run, &fit_config);
        crate::io::results::write_report_json(path, &report)?;
        info!(path = %path.display(), "wrote run report");
    }

    Ok(())
}

fn handle_models(config: &Config) -> Result<(), AppError> {
    let specs = config.model_specs(&ModelKind::ALL);
    print!("{}", crate::report::format_models(&specs));
    Ok(())
}

fn handle_generate(args: &GenerateArgs, config: &Config) -> Result<(), AppError> {
    let start: NaiveDateTime = parse_time(&args.start)
        .ok_or_else(|| AppError::input(format!("Invalid --start timestamp `{}`", args.start)))?;

    let sample = generate_wide(&SampleConfig {
        sensors: args.sensors,
        readings: args.readings,
        interval_minutes: args.interval,
        start,
        prefix: args
            .prefix
            .clone()
            .unwrap_or_else(|| config.input.sensor_prefix.clone()),
        seed: args.seed,
        noise_sd: args.noise,
        gap_prob: args.gaps,
        flat_sensor: args.flat,
    })?;

    let mut table = sample.table;
    table.time_column = config.input.time_column.clone();
    crate::io::export::write_wide_csv(&args.output, &table)?;

    println!(
        "Wrote {} readings x {} sensors to {}",
        table.rows.len(),
        table.sensor_columns.len(),
        args.output.display()
    );
    for t in &sample.truth {
        println!(
            "  {:<24} baseline={:.3} amplitude={:.3} tau={:.3}h",
            t.column, t.baseline, t.amplitude, t.tau
        );
    }
    Ok(())
}

/// Merge config file values and CLI overrides.
pub fn fit_config_from_args(args: &FitArgs, config: &Config) -> FitConfig {
    let kinds = match args.model {
        Some(set) => set.kinds(),
        None => config.models.enabled.clone(),
    };
    let solver = SolverOptions {
        max_iterations: args.max_iter.unwrap_or(config.solver.max_iterations),
        ..config.solver
    };

    FitConfig {
        csv_path: args.input.clone(),
        time_column: args
            .time_column
            .clone()
            .unwrap_or_else(|| config.input.time_column.clone()),
        sensor_prefix: args
            .prefix
            .clone()
            .unwrap_or_else(|| config.input.sensor_prefix.clone()),
        time_unit: args.unit.unwrap_or(config.input.time_unit),
        models: config.model_specs(&kinds),
        solver,
        select_best: args.best,
        export_flat: args.export_flat.clone(),
        export_coefficients: args.export_coef.clone(),
        export_pivot: args.export_pivot.clone(),
        export_json: args.export_json.clone(),
    }
}
