//! Model evaluation for the exponential and erfc families.
//!
//! The fitter relies on one primitive operation: predict `f(t)` given a
//! parameter vector. Jacobians are taken numerically by the solver, so each
//! model only needs its forward form here.
//!
//! At `t = 0` the erfc forms divide by `sqrt(0)`. `libm::erfc` maps `+inf` to
//! `0` and `-inf` to `2`, which are the analytic limits; a zero numerator gives
//! `0/0 = NaN`, which the fitter reports as an invalid domain.

use crate::domain::ModelKind;

/// Predict `f(t)` for the given model kind.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`.
pub fn predict(model: ModelKind, t: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::Exponential => {
            let (a, tau) = (params[0], params[1]);
            // 1 - exp(-x) computed as -expm1(-x).
            a * -(-t / tau).exp_m1()
        }
        ModelKind::Diffusion => {
            let (a, b) = (params[0], params[1]);
            a * libm::erfc(b / t.sqrt())
        }
        ModelKind::Convection => {
            let (a, b, c) = (params[0], params[1], params[2]);
            a * libm::erfc((b - c * t) / t.sqrt())
        }
    }
}

/// Evaluate the model at every `t`.
pub fn predict_all(model: ModelKind, ts: &[f64], params: &[f64]) -> Vec<f64> {
    ts.iter().map(|&t| predict(model, t, params)).collect()
}
