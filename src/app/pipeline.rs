//! The fit pipeline shared by the CLI and the tests.
//!
//! load -> pivot_longer -> compute_deltas -> nest -> fit_all -> successful
//! -> flatten / coefficients / glance (-> select_best)

use tracing::info;

use crate::domain::{
    CoefRow, FitConfig, FittedRun, FlatRow, GroupedTable, ModelRun, QualityRow, WideTable,
};
use crate::error::{AppError, EXIT_COMPUTE, EXIT_DATA};
use crate::fit::{Selection, failures, fit_all, select_best, successful};
use crate::io::ingest::load_wide;
use crate::io::results::{BestRow, FailureRow, RunReport};
use crate::report::{CoefPivot, coefficients, flatten, glance, pivot_coefficients};
use crate::tidy::{compute_deltas, nest, pivot_longer};

/// All computed outputs of a single `sensorfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub long_rows: usize,
    pub grouped: GroupedTable,
    /// Combined (model x group) table, failures included.
    pub runs: Vec<ModelRun>,
    pub fitted: Vec<FittedRun>,
    pub flat: Vec<FlatRow>,
    pub coefficients: Vec<CoefRow>,
    pub pivot: CoefPivot,
    pub quality: Vec<QualityRow>,
    pub selection: Option<Selection>,
}

/// Load the configured CSV and run the pipeline.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let wide = load_wide(&config.csv_path, &config.time_column, &config.sensor_prefix)?;
    run_fit_with_table(&wide, config)
}

/// Run the pipeline on an already loaded wide table.
pub fn run_fit_with_table(wide: &WideTable, config: &FitConfig) -> Result<RunOutput, AppError> {
    let long = pivot_longer(wide, &config.sensor_prefix);
    let observations = compute_deltas(&long, config.time_unit);
    if observations.is_empty() {
        return Err(AppError::new(EXIT_DATA, "No sensor readings remain after dropping gaps."));
    }

    let grouped = nest(&observations);
    info!(
        groups = grouped.len(),
        observations = observations.len(),
        models = config.models.len(),
        "nested observations"
    );

    let runs = fit_all(&config.models, &grouped, &config.solver);
    let fitted = successful(&runs);
    if config.select_best && fitted.is_empty() {
        return Err(AppError::new(
            EXIT_COMPUTE,
            "No model produced a fit; cannot pick a best model per sensor.",
        ));
    }

    let flat = flatten(&fitted, &grouped)?;
    let coefficients = coefficients(&fitted);
    let pivot = pivot_coefficients(&coefficients);
    let quality = glance(&fitted);
    let selection = config.select_best.then(|| select_best(&fitted, &grouped));

    Ok(RunOutput {
        long_rows: long.rows.len(),
        grouped,
        runs,
        fitted,
        flat,
        coefficients,
        pivot,
        quality,
        selection,
    })
}

/// Build the JSON run report for `run`.
pub fn build_report(run: &RunOutput, config: &FitConfig) -> RunReport {
    let failures = failures(&run.runs)
        .into_iter()
        .map(|(model_id, group_id, reason)| FailureRow {
            model_id,
            group_id,
            reason,
        })
        .collect();

    let best = run
        .selection
        .as_ref()
        .map(|s| {
            s.groups
                .iter()
                .map(|g| BestRow {
                    group_id: g.group_id.clone(),
                    model_id: g.best.model_id.clone(),
                    bic: g.best.fit.bic,
                })
                .collect()
        })
        .unwrap_or_default();

    RunReport {
        tool: "sensorfit".to_string(),
        input: config.csv_path.display().to_string(),
        time_unit: config.time_unit,
        models: config.models.clone(),
        quality: run.quality.clone(),
        coefficients: run.coefficients.clone(),
        failures,
        best,
    }
}
