//! `sensor-curves` library crate.
//!
//! Reshapes wide sensor tables into tidy long form, nests them per sensor and
//! fits a small family of heat-transfer curves to every group. The `sensorfit`
//! binary is a thin wrapper so the pipeline can be tested in-process.
//!
//! Data flow:
//!
//! - `io::ingest` reads the wide CSV
//! - `tidy` pivots to long form, computes elapsed/delta and nests per sensor
//! - `fit` runs every model against every group, keeping failures as values
//! - `report` unnests predictions/residuals and tabulates coefficients
//! - `io::export` / `io::results` write the outputs

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod tidy;
