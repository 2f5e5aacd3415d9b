//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit one model to one group, turning failures into values (`fitter`)
//! - apply every model to every group and filter successes (`batch`)
//! - pick the best model per group using BIC (`selection`)

pub mod batch;
pub mod fitter;
pub mod selection;

pub use batch::*;
pub use fitter::*;
pub use selection::*;
