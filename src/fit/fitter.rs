//! Fitting a single model to a single group.
//!
//! Given:
//! - elapsed times `t_i`
//! - deltas `y_i`
//! - a model spec (functional form + initial guesses)
//!
//! we run Levenberg–Marquardt from the initial guesses, check that the
//! Jacobian at the solution has full rank, and derive standard errors and
//! information criteria.
//!
//! `try_fit` returns `Result<ModelFit, FitFailure>`; `fit_group` folds that into
//! a `FitOutcome` so that batch code never sees an error cross this boundary.

use tracing::debug;

use crate::domain::{FitOutcome, GroupTable, ModelFit, ModelSpec, SolverOptions};
use crate::error::FitFailure;
use crate::math::{LmError, condition_ratio, minimize, normal_inverse};
use crate::models::predict;

/// Fit `spec` to the `(elapsed, delta)` pairs of `group`. Never fails.
pub fn fit_group(spec: &ModelSpec, group: &GroupTable, opts: &SolverOptions) -> FitOutcome {
    match try_fit(spec, &group.elapsed(), &group.deltas(), opts) {
        Ok(fit) => {
            debug!(
                model = %spec.id,
                group = %group.group_id,
                iterations = fit.iterations,
                rmse = fit.rmse,
                "fit converged"
            );
            FitOutcome::Success(fit)
        }
        Err(reason) => {
            debug!(model = %spec.id, group = %group.group_id, %reason, "fit failed");
            FitOutcome::Failure(reason)
        }
    }
}

/// Fit `spec` to raw `(t, y)` arrays.
pub fn try_fit(spec: &ModelSpec, ts: &[f64], ys: &[f64], opts: &SolverOptions) -> Result<ModelFit, FitFailure> {
    let kind = spec.kind;
    let k = kind.param_count();
    let n = ts.len().min(ys.len());

    if spec.initial.len() != k {
        return Err(FitFailure::InvalidDomain {
            detail: format!(
                "model {} expects {k} initial values, got {}",
                spec.id,
                spec.initial.len()
            ),
        });
    }
    if n <= k {
        return Err(FitFailure::InsufficientData { n, k });
    }
    if ts.iter().chain(ys).any(|v| !v.is_finite()) {
        return Err(FitFailure::InvalidDomain {
            detail: "non-finite elapsed time or delta in input".to_string(),
        });
    }

    let report = minimize(|t, p: &[f64]| predict(kind, t, p), &ts[..n], &ys[..n], &spec.initial, opts)
        .map_err(|e| match e {
            LmError::NonFinite { stage } => FitFailure::InvalidDomain {
                detail: format!("model {} is not finite at the {stage}", spec.id),
            },
            LmError::MaxIterations { iterations } => FitFailure::NonConvergence { iterations },
            LmError::DampingOverflow { damping } => FitFailure::StepFactorTooSmall { damping },
        })?;

    let ratio = condition_ratio(&report.jacobian);
    if ratio < opts.rank_tol {
        return Err(FitFailure::SingularGradient { ratio });
    }
    let inv = normal_inverse(&report.jacobian).ok_or(FitFailure::SingularGradient { ratio })?;

    let df = (n - k) as f64;
    let sigma2 = report.sse / df;
    let covariance: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| inv[(i, j)] * sigma2).collect())
        .collect();
    let std_errors: Vec<f64> = (0..k).map(|i| covariance[i][i].max(0.0).sqrt()).collect();

    let (aic, bic) = information_criteria(report.sse, n, k);

    Ok(ModelFit {
        kind,
        params: report.params.iter().copied().collect(),
        std_errors,
        covariance,
        residuals: report.residuals.iter().copied().collect(),
        sse: report.sse,
        rmse: (report.sse / n as f64).sqrt(),
        aic,
        bic,
        n,
        iterations: report.iterations,
    })
}

/// Gaussian AIC/BIC, counting the residual variance as a parameter.
///
/// `ln L = -n/2 * (ln(2π) + ln(SSE/n) + 1)`
pub fn information_criteria(sse: f64, n: usize, k: usize) -> (f64, f64) {
    let nf = n as f64;
    // Exact fits would give ln(0); floor the residual variance.
    let sse_per = (sse / nf).max(1e-12);
    let log_lik = -0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + sse_per.ln() + 1.0);
    let p = (k + 1) as f64;
    let aic = -2.0 * log_lik + 2.0 * p;
    let bic = -2.0 * log_lik + nf.ln() * p;
    (aic, bic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupRow, ModelKind};
    use chrono::NaiveDate;

    fn group_from(id: &str, ts: &[f64], ys: &[f64]) -> GroupTable {
        let t0 = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rows = ts
            .iter()
            .zip(ys)
            .map(|(&t, &y)| GroupRow {
                time: t0 + chrono::Duration::seconds((t * 3600.0) as i64),
                value: 20.0 + y,
                elapsed: t,
                delta: y,
            })
            .collect();
        GroupTable {
            group_id: id.to_string(),
            rows,
        }
    }

    fn relaxation(ts: &[f64], a: f64, tau: f64) -> Vec<f64> {
        ts.iter()
            .enumerate()
            .map(|(i, &t)| a * (1.0 - (-t / tau).exp()) + 0.02 * ((i as f64) * 2.3).sin())
            .collect()
    }

    #[test]
    fn exponential_fit_recovers_parameters() {
        let ts: Vec<f64> = (0..25).map(|i| i as f64 * 0.5).collect();
        let ys = relaxation(&ts, 5.0, 2.0);
        let group = group_from("s1", &ts, &ys);

        let outcome = fit_group(&ModelSpec::new(ModelKind::Exponential), &group, &SolverOptions::default());
        let fit = outcome.fit().expect("exponential fit should converge");
        assert!((fit.param("a").unwrap() - 5.0).abs() < 0.05, "a={:?}", fit.params);
        assert!((fit.param("tau").unwrap() - 2.0).abs() < 0.05, "tau={:?}", fit.params);
        assert_eq!(fit.residuals.len(), ts.len());
        assert!(fit.std_errors.iter().all(|s| s.is_finite() && *s >= 0.0));
    }

    #[test]
    fn diffusion_fit_recovers_parameters() {
        let ts: Vec<f64> = (1..30).map(|i| i as f64 * 0.5).collect();
        let ys: Vec<f64> = ts.iter().map(|&t| 3.0 * libm::erfc(1.2 / t.sqrt())).collect();
        let group = group_from("s2", &ts, &ys);

        let outcome = fit_group(&ModelSpec::new(ModelKind::Diffusion), &group, &SolverOptions::default());
        let fit = outcome.fit().expect("diffusion fit should converge");
        assert!((fit.param("a").unwrap() - 3.0).abs() < 1e-3, "params={:?}", fit.params);
        assert!((fit.param("b").unwrap() - 1.2).abs() < 1e-3, "params={:?}", fit.params);
    }

    #[test]
    fn fitting_twice_is_deterministic() {
        let ts: Vec<f64> = (0..25).map(|i| i as f64 * 0.5).collect();
        let ys = relaxation(&ts, 4.0, 3.0);
        let group = group_from("s1", &ts, &ys);
        let spec = ModelSpec::new(ModelKind::Exponential);

        let a = fit_group(&spec, &group, &SolverOptions::default());
        let b = fit_group(&spec, &group, &SolverOptions::default());
        let (fa, fb) = (a.fit().unwrap(), b.fit().unwrap());
        for (x, y) in fa.params.iter().zip(&fb.params) {
            assert!((x - y).abs() <= 1e-9, "{x} vs {y}");
        }
    }

    #[test]
    fn constant_zero_series_fails_for_convection() {
        let ts: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let ys = vec![0.0; ts.len()];
        let group = group_from("flat", &ts, &ys);

        let outcome = fit_group(&ModelSpec::new(ModelKind::Convection), &group, &SolverOptions::default());
        assert!(!outcome.is_success(), "expected failure, got {outcome:?}");
        assert!(outcome.failure().is_some());
    }

    #[test]
    fn too_few_points_is_insufficient_data() {
        let group = group_from("tiny", &[0.0, 1.0], &[0.0, 1.0]);
        let outcome = fit_group(&ModelSpec::new(ModelKind::Exponential), &group, &SolverOptions::default());
        assert_eq!(outcome.failure(), Some(&FitFailure::InsufficientData { n: 2, k: 2 }));
    }

    #[test]
    fn wrong_initial_length_is_invalid_domain() {
        let ts: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys = relaxation(&ts, 2.0, 1.0);
        let group = group_from("s", &ts, &ys);
        let spec = ModelSpec::new(ModelKind::Exponential).with_initial(vec![1.0]);
        let outcome = fit_group(&spec, &group, &SolverOptions::default());
        assert!(matches!(outcome.failure(), Some(FitFailure::InvalidDomain { .. })));
    }

    #[test]
    fn zero_numerator_at_time_zero_is_invalid_domain() {
        let ts: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys = relaxation(&ts, 2.0, 1.0);
        let group = group_from("s", &ts, &ys);
        let spec = ModelSpec::new(ModelKind::Diffusion).with_initial(vec![1.0, 0.0]);
        let outcome = fit_group(&spec, &group, &SolverOptions::default());
        assert!(matches!(outcome.failure(), Some(FitFailure::InvalidDomain { .. })), "{outcome:?}");
    }

    #[test]
    fn information_criteria_penalize_parameters() {
        let (aic2, bic2) = information_criteria(1.0, 20, 2);
        let (aic3, bic3) = information_criteria(1.0, 20, 3);
        assert!((aic3 - aic2 - 2.0).abs() < 1e-12);
        assert!((bic3 - bic2 - 20f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn exact_fit_has_finite_information_criteria() {
        let (aic, bic) = information_criteria(0.0, 10, 2);
        assert!(aic.is_finite() && bic.is_finite(), "aic={aic} bic={bic}");
        assert_eq!((aic, bic), information_criteria(1e-12, 10, 2));
    }
}
