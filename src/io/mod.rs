//! Input/output helpers.
//!
//! - wide CSV ingest (`ingest`)
//! - result table exports to CSV (`export`)
//! - JSON run report (`results`)

pub mod export;
pub mod ingest;
pub mod results;

pub use export::*;
pub use ingest::*;
pub use results::*;
