//! Small dense linear-algebra helpers for the solver.
//!
//! Parameter dimension is tiny (2–3 columns) and row counts are at most a few
//! thousand readings per sensor, so SVD and explicit inverses are cheap.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem `min |x β - y|` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Ratio of smallest to largest singular value of `m`.
///
/// `0.0` for an all-zero matrix or one with non-finite entries.
pub fn condition_ratio(m: &DMatrix<f64>) -> f64 {
    if m.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }
    let sv = m.singular_values();
    let max = sv.iter().copied().fold(0.0_f64, f64::max);
    let min = sv.iter().copied().fold(f64::INFINITY, f64::min);
    if max <= 0.0 || !min.is_finite() {
        return 0.0;
    }
    min / max
}

/// `(JᵀJ)⁻¹` for a Jacobian `j`, or `None` when it is not invertible.
pub fn normal_inverse(j: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let jtj = j.transpose() * j;
    let inv = jtj.try_inverse()?;
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn condition_ratio_flags_zero_column() {
        let m = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        assert!(condition_ratio(&m) < 1e-12);

        let id = DMatrix::<f64>::identity(3, 3);
        assert!((condition_ratio(&id) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normal_inverse_of_identity_is_identity() {
        let j = DMatrix::<f64>::identity(2, 2);
        let inv = normal_inverse(&j).unwrap();
        assert!((inv[(0, 0)] - 1.0).abs() < 1e-12);
        assert!(inv[(0, 1)].abs() < 1e-12);
    }

    #[test]
    fn normal_inverse_rejects_rank_deficient_jacobian() {
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        // Exactly collinear columns: either no inverse or a non-finite one.
        if let Some(inv) = normal_inverse(&j) {
            let huge = inv.iter().any(|v| v.abs() > 1e12);
            assert!(huge, "expected ill-conditioned inverse, got {inv}");
        }
    }
}
