//! Reporting utilities: predictions, residuals and flat result tables.
//!
//! Everything here consumes `FittedRun`s, so an absent fit can never reach
//! prediction. Terminal formatting lives in `format`.

use crate::domain::{
    CoefRow, FittedRun, FlatRow, GroupTable, GroupedTable, ModelFit, Prediction, QualityRow,
};
use crate::error::{AppError, EXIT_COMPUTE};
use crate::models::predict_all;

pub mod format;

pub use format::*;

/// Predicted values and residuals for each row of `group`, index-aligned.
pub fn augment(fit: &ModelFit, group: &GroupTable) -> Vec<Prediction> {
    predict_all(fit.kind, &group.elapsed(), &fit.params)
        .into_iter()
        .zip(&group.rows)
        .map(|(predicted, r)| Prediction {
            predicted,
            residual: r.delta - predicted,
        })
        .collect()
}

/// Expand every fitted run into one row per observation of its group.
pub fn flatten(fitted: &[FittedRun], grouped: &GroupedTable) -> Result<Vec<FlatRow>, AppError> {
    let mut out = Vec::new();
    for run in fitted {
        let group = grouped.get(&run.group_id).ok_or_else(|| {
            AppError::new(
                EXIT_COMPUTE,
                format!("Fitted run refers to unknown group '{}'.", run.group_id),
            )
        })?;

        for (row, p) in group.rows.iter().zip(augment(&run.fit, group)) {
            out.push(FlatRow {
                model_id: run.model_id.clone(),
                group_id: run.group_id.clone(),
                elapsed: row.elapsed,
                measured: row.delta,
                predicted: p.predicted,
                residual: p.residual,
            });
        }
    }
    Ok(out)
}

/// One row per (model, group, parameter).
pub fn coefficients(fitted: &[FittedRun]) -> Vec<CoefRow> {
    fitted
        .iter()
        .flat_map(|run| {
            run.fit
                .kind
                .param_names()
                .iter()
                .zip(run.fit.params.iter().zip(&run.fit.std_errors))
                .map(move |(name, (&estimate, &std_error))| CoefRow {
                    model_id: run.model_id.clone(),
                    group_id: run.group_id.clone(),
                    param: name.to_string(),
                    estimate,
                    std_error,
                })
        })
        .collect()
}

/// Coefficients pivoted to `(model, group) x parameter`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoefPivot {
    /// Union of parameter names, in first-seen order.
    pub params: Vec<String>,
    /// `(model_id, group_id, value per param)`; `None` where a model lacks the param.
    pub rows: Vec<(String, String, Vec<Option<f64>>)>,
}

pub fn pivot_coefficients(rows: &[CoefRow]) -> CoefPivot {
    let mut pivot = CoefPivot::default();
    for r in rows {
        if !pivot.params.contains(&r.param) {
            pivot.params.push(r.param.clone());
        }
    }

    for r in rows {
        let col = pivot.params.iter().position(|p| *p == r.param).unwrap_or(0);
        let idx = match pivot
            .rows
            .iter()
            .position(|(m, g, _)| *m == r.model_id && *g == r.group_id)
        {
            Some(i) => i,
            None => {
                pivot
                    .rows
                    .push((r.model_id.clone(), r.group_id.clone(), Vec::new()));
                pivot.rows.len() - 1
            }
        };
        let cells = &mut pivot.rows[idx].2;
        cells.resize(pivot.params.len(), None);
        cells[col] = Some(r.estimate);
    }

    for (_, _, cells) in &mut pivot.rows {
        cells.resize(pivot.params.len(), None);
    }
    pivot
}

/// Per-run quality diagnostics.
pub fn glance(fitted: &[FittedRun]) -> Vec<QualityRow> {
    fitted
        .iter()
        .map(|run| QualityRow {
            model_id: run.model_id.clone(),
            group_id: run.group_id.clone(),
            n: run.fit.n,
            sse: run.fit.sse,
            rmse: run.fit.rmse,
            aic: run.fit.aic,
            bic: run.fit.bic,
            iterations: run.fit.iterations,
        })
        .collect()
}
