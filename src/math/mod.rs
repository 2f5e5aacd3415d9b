//! Mathematical utilities: dense least squares and the Levenberg–Marquardt solver.

pub mod linalg;
pub mod lm;

pub use linalg::*;
pub use lm::*;
