//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`TimeUnit`, `ModelSet`, `ModelKind`)
//! - wide/long/grouped table shapes (`WideTable`, `LongTable`, `GroupedTable`)
//! - fit outputs (`FitOutcome`, `ModelFit`, `FittedRun`) and report rows

pub mod types;

pub use types::*;
