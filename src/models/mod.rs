//! Heat-transfer model implementations.
//!
//! Models are small, pure functions so that the fitting code can stay generic.

pub mod model;

pub use model::*;
