//! Best-model-per-group selection using BIC.
//!
//! For each group we consider every successful fit and:
//! 1. choose the model with minimum BIC
//! 2. if a model with fewer parameters is within ΔBIC < 2 of that, pick the
//!    simpler one (differences below 2 are not meaningful evidence)
//!
//! Groups with no successful fit are reported as skipped.

use crate::domain::{FittedRun, GroupedTable};

/// ΔBIC below which two models are treated as equivalent.
const BIC_TIE: f64 = 2.0;

/// Selected model for one group.
#[derive(Debug, Clone)]
pub struct GroupSelection {
    pub group_id: String,
    pub best: FittedRun,
    /// BIC of each candidate (model id, bic), in input order.
    pub candidates: Vec<(String, f64)>,
}

/// Output of per-group selection.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub groups: Vec<GroupSelection>,
    /// Groups where no model produced a fit.
    pub skipped: Vec<String>,
}

/// Pick the best model for each group of `grouped`.
pub fn select_best(fitted: &[FittedRun], grouped: &GroupedTable) -> Selection {
    let mut out = Selection::default();

    for group in grouped.iter() {
        let runs: Vec<&FittedRun> = fitted.iter().filter(|r| r.group_id == group.group_id).collect();
        if runs.is_empty() {
            out.skipped.push(group.group_id.clone());
            continue;
        }

        let candidates = runs.iter().map(|r| (r.model_id.clone(), r.fit.bic)).collect();
        let best = select_by_bic(&runs);
        out.groups.push(GroupSelection {
            group_id: group.group_id.clone(),
            best: best.clone(),
            candidates,
        });
    }

    out
}

fn select_by_bic<'a>(runs: &[&'a FittedRun]) -> &'a FittedRun {
    // Minimum BIC; ties keep the earlier run. NaN never wins.
    let mut best = runs[0];
    for &r in &runs[1..] {
        if r.fit.bic < best.fit.bic || best.fit.bic.is_nan() {
            best = r;
        }
    }

    // Within the tie band: fewest parameters, then lowest BIC.
    let mut chosen = best;
    for &r in runs {
        if r.fit.bic - best.fit.bic >= BIC_TIE {
            continue;
        }
        let (k, k_chosen) = (r.fit.kind.param_count(), chosen.fit.kind.param_count());
        if k < k_chosen || (k == k_chosen && r.fit.bic < chosen.fit.bic) {
            chosen = r;
        }
    }
    chosen
}
