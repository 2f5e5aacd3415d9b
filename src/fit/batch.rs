//! Cross product of model specs and groups.
//!
//! `fit_all` produces one `ModelRun` per (spec, group) pair, failures included.
//! Failed rows are only removed by the explicit `successful` filter, which also
//! changes the row type so that later stages cannot receive an absent fit.

use tracing::{info, warn};

use crate::domain::{FitOutcome, FittedRun, GroupedTable, ModelRun, ModelSpec, SolverOptions};
use crate::error::FitFailure;
use crate::fit::fitter::fit_group;

/// Fit every spec to every group, in model order then group order.
pub fn fit_all(specs: &[ModelSpec], grouped: &GroupedTable, opts: &SolverOptions) -> Vec<ModelRun> {
    let mut runs = Vec::with_capacity(specs.len() * grouped.len());

    for spec in specs {
        let mut ok = 0usize;
        for group in grouped.iter() {
            let outcome = fit_group(spec, group, opts);
            if outcome.is_success() {
                ok += 1;
            }
            runs.push(ModelRun {
                model_id: spec.id.clone(),
                group_id: group.group_id.clone(),
                outcome,
            });
        }
        info!(model = %spec.id, ok, total = grouped.len(), "model applied to groups");
    }

    runs
}

/// Keep only successful runs.
pub fn successful(runs: &[ModelRun]) -> Vec<FittedRun> {
    runs.iter()
        .filter_map(|run| match &run.outcome {
            FitOutcome::Success(fit) => Some(FittedRun {
                model_id: run.model_id.clone(),
                group_id: run.group_id.clone(),
                fit: fit.clone(),
            }),
            FitOutcome::Failure(_) => None,
        })
        .collect()
}

/// Failed runs with their reasons, for diagnostics.
pub fn failures(runs: &[ModelRun]) -> Vec<(String, String, FitFailure)> {
    let out: Vec<(String, String, FitFailure)> = runs
        .iter()
        .filter_map(|run| {
            run.outcome
                .failure()
                .map(|reason| (run.model_id.clone(), run.group_id.clone(), reason.clone()))
        })
        .collect();

    for (model, group, reason) in &out {
        warn!(%model, %group, %reason, "fit dropped");
    }
    out
}
