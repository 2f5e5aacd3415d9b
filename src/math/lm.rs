//! Levenberg–Marquardt for small nonlinear least-squares problems.
//!
//! We minimize `Σ r_i(p)^2` where `r_i(p) = y_i - f(x_i; p)`.
//!
//! Each iteration solves the damped Gauss–Newton step as an augmented linear
//! least-squares problem:
//!
//! ```text
//! [ J          ] δ = [ -r ]
//! [ sqrt(λ s) I]     [  0 ]
//! ```
//!
//! with `s = max(diag(JᵀJ))`, so the damping never leaves the system singular
//! even when a Jacobian column vanishes. Jacobians are forward differences.
//! The iteration is fully deterministic for a given starting point.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::domain::SolverOptions;
use crate::math::linalg::solve_least_squares;

/// Solver state at convergence.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    /// `∂r/∂p` at `params`.
    pub jacobian: DMatrix<f64>,
    pub sse: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LmError {
    #[error("non-finite residuals at {stage}")]
    NonFinite { stage: &'static str },

    #[error("no convergence after {iterations} iterations")]
    MaxIterations { iterations: usize },

    #[error("damping grew to {damping:.3e} without a downhill step")]
    DampingOverflow { damping: f64 },
}

/// Residual vector `y - f(x; p)`, or `None` if any entry is not finite.
fn residuals<F>(f: &F, xs: &[f64], ys: &[f64], p: &[f64]) -> Option<DVector<f64>>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let r = DVector::from_iterator(xs.len(), xs.iter().zip(ys).map(|(&x, &y)| y - f(x, p)));
    if r.iter().all(|v| v.is_finite()) {
        Some(r)
    } else {
        None
    }
}

/// Forward-difference Jacobian of the residuals.
fn jacobian<F>(f: &F, xs: &[f64], ys: &[f64], p: &DVector<f64>, r: &DVector<f64>) -> Option<DMatrix<f64>>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let n = xs.len();
    let k = p.len();
    let mut j = DMatrix::<f64>::zeros(n, k);
    let mut shifted: Vec<f64> = p.iter().copied().collect();

    for col in 0..k {
        let h = f64::EPSILON.sqrt() * p[col].abs().max(1e-3);
        shifted[col] = p[col] + h;
        let r_h = residuals(f, xs, ys, &shifted)?;
        shifted[col] = p[col];
        for row in 0..n {
            j[(row, col)] = (r_h[row] - r[row]) / h;
        }
    }

    Some(j)
}

/// Minimize the squared residuals of `f` against `(xs, ys)` starting from `p0`.
pub fn minimize<F>(
    f: F,
    xs: &[f64],
    ys: &[f64],
    p0: &[f64],
    opts: &SolverOptions,
) -> Result<LmReport, LmError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let k = p0.len();
    let mut p = DVector::from_row_slice(p0);
    let mut r = residuals(&f, xs, ys, p0).ok_or(LmError::NonFinite { stage: "initial guess" })?;
    let mut sse = r.norm_squared();
    let mut lambda = opts.initial_damping;
    let mut iterations = 0usize;

    loop {
        if sse <= opts.sse_floor {
            break;
        }
        if iterations >= opts.max_iterations {
            return Err(LmError::MaxIterations { iterations });
        }
        iterations += 1;

        let j = jacobian(&f, xs, ys, &p, &r).ok_or(LmError::NonFinite { stage: "jacobian" })?;
        let scale = (0..k)
            .map(|c| j.column(c).norm_squared())
            .fold(0.0_f64, f64::max)
            .max(f64::MIN_POSITIVE);

        let mut converged = false;
        loop {
            let step = damped_step(&j, &r, (lambda * scale).sqrt());
            let Some(delta) = step else {
                lambda *= 10.0;
                if lambda > opts.max_damping {
                    return Err(LmError::DampingOverflow { damping: lambda });
                }
                continue;
            };

            let rel_x = delta.norm() / (p.norm() + opts.xtol);
            let trial = &p + &delta;
            let trial_r = residuals(&f, xs, ys, trial.as_slice());
            let trial_sse = trial_r.as_ref().map(|v| v.norm_squared());

            match (trial_r, trial_sse) {
                (Some(trial_r), Some(trial_sse)) if trial_sse < sse => {
                    let rel_f = (sse - trial_sse) / sse;
                    p = trial;
                    r = trial_r;
                    sse = trial_sse;
                    lambda = (lambda / 10.0).max(1e-15);
                    converged = rel_f < opts.ftol || rel_x < opts.xtol;
                    break;
                }
                _ => {
                    // Uphill or out of domain. A vanishing step means we are
                    // already at the minimum to working precision.
                    if rel_x < opts.xtol {
                        converged = true;
                        break;
                    }
                    lambda *= 10.0;
                    if lambda > opts.max_damping {
                        return Err(LmError::DampingOverflow { damping: lambda });
                    }
                }
            }
        }

        if converged {
            break;
        }
    }

    let jacobian = jacobian(&f, xs, ys, &p, &r).ok_or(LmError::NonFinite { stage: "solution" })?;
    Ok(LmReport {
        params: p,
        residuals: r,
        jacobian,
        sse,
        iterations,
    })
}

fn damped_step(j: &DMatrix<f64>, r: &DVector<f64>, mu: f64) -> Option<DVector<f64>> {
    let (n, k) = j.shape();
    let mut a = DMatrix::<f64>::zeros(n + k, k);
    let mut b = DVector::<f64>::zeros(n + k);

    a.view_mut((0, 0), (n, k)).copy_from(j);
    for i in 0..k {
        a[(n + i, i)] = mu;
    }
    for i in 0..n {
        b[i] = -r[i];
    }

    solve_least_squares(&a, &b)
}
