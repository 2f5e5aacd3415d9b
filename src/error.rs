//! Error types.
//!
//! Two layers:
//! - `AppError`: fatal, CLI-facing errors carrying a process exit code.
//! - `FitFailure`: the reason a single (model, group) fit did not produce
//!   estimates. It is stored as a value inside `FitOutcome` and never aborts a run.

use serde::Serialize;
use thiserror::Error;

/// Bad input file, bad flags or bad config.
pub const EXIT_INPUT: u8 = 2;
/// Not enough usable data to continue.
pub const EXIT_DATA: u8 = 3;
/// Numerical or output failure.
pub const EXIT_COMPUTE: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Why a nonlinear fit produced no estimates.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitFailure {
    #[error("insufficient data: n={n} observations for k={k} parameters")]
    InsufficientData { n: usize, k: usize },

    #[error("invalid domain: {detail}")]
    InvalidDomain { detail: String },

    #[error("singular gradient at parameter estimates (condition ratio {ratio:.3e})")]
    SingularGradient { ratio: f64 },

    #[error("no convergence after {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("step factor reduced below minimum (damping {damping:.3e})")]
    StepFactorTooSmall { damping: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_failure_messages_keep_details() {
        let f = FitFailure::InsufficientData { n: 2, k: 3 };
        assert_eq!(f.to_string(), "insufficient data: n=2 observations for k=3 parameters");

        let f = FitFailure::NonConvergence { iterations: 50 };
        assert!(f.to_string().contains("50"));
    }

    #[test]
    fn app_error_carries_exit_code() {
        let e = AppError::input("missing column");
        assert_eq!(e.exit_code(), EXIT_INPUT);
        assert_eq!(e.to_string(), "missing column");
        assert_eq!(e.message(), "missing column");
    }
}
