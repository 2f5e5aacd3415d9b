//! Tidy-data reshaping: wide -> long, per-group deltas, nest/unnest.

pub mod nest;
pub mod reshape;

pub use nest::*;
pub use reshape::*;
