//! JSON run report.
//!
//! The run report is the portable summary of one `sensorfit fit` run:
//! model specs, quality diagnostics, coefficients, failure reasons and
//! (optionally) the best model per sensor.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{CoefRow, ModelSpec, QualityRow, TimeUnit};
use crate::error::{AppError, EXIT_COMPUTE, FitFailure};

#[derive(Debug, Clone, Serialize)]
pub struct FailureRow {
    pub model_id: String,
    pub group_id: String,
    pub reason: FitFailure,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestRow {
    pub group_id: String,
    pub model_id: String,
    pub bic: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub tool: String,
    pub input: String,
    pub time_unit: TimeUnit,
    pub models: Vec<ModelSpec>,
    pub quality: Vec<QualityRow>,
    pub coefficients: Vec<CoefRow>,
    pub failures: Vec<FailureRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub best: Vec<BestRow>,
}

pub fn write_report<W: Write>(writer: W, report: &RunReport) -> Result<(), AppError> {
    serde_json::to_writer_pretty(writer, report)
        .map_err(|e| AppError::new(EXIT_COMPUTE, format!("Failed to write run report JSON: {e}")))
}

pub fn write_report_json(path: &Path, report: &RunReport) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_COMPUTE,
            format!("Failed to create run report '{}': {e}", path.display()),
        )
    })?;
    write_report(file, report)
}
