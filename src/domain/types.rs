//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory while reshaping and fitting
//! - exported to CSV/JSON
//! - printed by the report module without extra conversion

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitFailure;

/// Unit used to express elapsed time since a sensor's first reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Number of seconds in one unit.
    pub fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Days => 86_400.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "min",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }
}

/// Which model(s) to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSet {
    All,
    Exponential,
    Diffusion,
    Convection,
}

impl ModelSet {
    pub fn kinds(self) -> Vec<ModelKind> {
        match self {
            ModelSet::All => ModelKind::ALL.to_vec(),
            ModelSet::Exponential => vec![ModelKind::Exponential],
            ModelSet::Diffusion => vec![ModelKind::Diffusion],
            ModelSet::Convection => vec![ModelKind::Convection],
        }
    }
}

/// Functional form of a heat-transfer model.
///
/// - `Exponential`: `a * (1 - exp(-t / tau))`
/// - `Diffusion`:   `a * erfc(b / sqrt(t))`
/// - `Convection`:  `a * erfc((b - c*t) / sqrt(t))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Exponential,
    Diffusion,
    Convection,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Exponential,
        ModelKind::Diffusion,
        ModelKind::Convection,
    ];

    /// Stable identifier used in tables and exports.
    pub fn id(self) -> &'static str {
        match self {
            ModelKind::Exponential => "exponential",
            ModelKind::Diffusion => "diffusion",
            ModelKind::Convection => "convection",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Exponential => "Exp. relaxation",
            ModelKind::Diffusion => "erfc diffusion",
            ModelKind::Convection => "erfc + convection",
        }
    }

    pub fn formula(self) -> &'static str {
        match self {
            ModelKind::Exponential => "a * (1 - exp(-t / tau))",
            ModelKind::Diffusion => "a * erfc(b / sqrt(t))",
            ModelKind::Convection => "a * erfc((b - c*t) / sqrt(t))",
        }
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Exponential => &["a", "tau"],
            ModelKind::Diffusion => &["a", "b"],
            ModelKind::Convection => &["a", "b", "c"],
        }
    }

    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    /// Built-in starting values for the solver.
    pub fn default_initial(self) -> Vec<f64> {
        match self {
            ModelKind::Exponential => vec![1.0, 1.0],
            ModelKind::Diffusion => vec![1.0, 1.0],
            ModelKind::Convection => vec![1.0, 1.0, 0.1],
        }
    }
}

/// A named model with its initial parameter guesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub kind: ModelKind,
    pub initial: Vec<f64>,
}

impl ModelSpec {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            id: kind.id().to_string(),
            kind,
            initial: kind.default_initial(),
        }
    }

    pub fn with_initial(mut self, initial: Vec<f64>) -> Self {
        self.initial = initial;
        self
    }
}

/// One row of the wide input: a timestamp and one value slot per sensor column.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub time: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

/// Wide input table: one time column plus N sensor columns.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub time_column: String,
    /// Original sensor column names, in file order.
    pub sensor_columns: Vec<String>,
    pub rows: Vec<WideRow>,
}

/// One (time, sensor) pair in long form.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub time: NaiveDateTime,
    pub sensor_id: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTable {
    pub rows: Vec<LongRow>,
}

/// A complete observation with per-group elapsed time and delta.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub group_id: String,
    pub time: NaiveDateTime,
    pub value: f64,
    /// Time since the group's first reading, in the configured unit.
    pub elapsed: f64,
    /// Value minus the group's first value.
    pub delta: f64,
}

/// An observation with the group key moved to the enclosing `GroupTable`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub time: NaiveDateTime,
    pub value: f64,
    pub elapsed: f64,
    pub delta: f64,
}

/// All rows of one group, in original order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTable {
    pub group_id: String,
    pub rows: Vec<GroupRow>,
}

impl GroupTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn elapsed(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.elapsed).collect()
    }

    pub fn deltas(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.delta).collect()
    }
}

/// Group key -> owned sub-table, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedTable {
    pub groups: Vec<GroupTable>,
}

/// Solver tuning for Levenberg–Marquardt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Relative SSE reduction below which the fit is considered converged.
    pub ftol: f64,
    /// Relative step size below which the fit is considered converged.
    pub xtol: f64,
    /// SSE at or below this value counts as an exact fit.
    pub sse_floor: f64,
    pub initial_damping: f64,
    /// Damping above this value means no downhill step exists.
    pub max_damping: f64,
    /// Smallest accepted ratio of singular values of the Jacobian.
    pub rank_tol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            sse_floor: 1e-24,
            initial_damping: 1e-3,
            max_damping: 1e12,
            rank_tol: 1e-8,
        }
    }
}

/// Successful fit of one model to one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFit {
    pub kind: ModelKind,
    pub params: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Row-major `k x k` parameter covariance.
    pub covariance: Vec<Vec<f64>>,
    /// `delta - fitted` at each training point.
    pub residuals: Vec<f64>,
    pub sse: f64,
    pub rmse: f64,
    pub aic: f64,
    pub bic: f64,
    pub n: usize,
    pub iterations: usize,
}

impl ModelFit {
    pub fn param(&self, name: &str) -> Option<f64> {
        self.kind
            .param_names()
            .iter()
            .position(|p| *p == name)
            .and_then(|i| self.params.get(i).copied())
    }
}

/// Result of one fit attempt: estimates or the reason there are none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FitOutcome {
    Success(ModelFit),
    Failure(FitFailure),
}

impl FitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FitOutcome::Success(_))
    }

    pub fn fit(&self) -> Option<&ModelFit> {
        match self {
            FitOutcome::Success(fit) => Some(fit),
            FitOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FitFailure> {
        match self {
            FitOutcome::Success(_) => None,
            FitOutcome::Failure(reason) => Some(reason),
        }
    }
}

/// One row of the combined (model x group) table, before filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRun {
    pub model_id: String,
    pub group_id: String,
    pub outcome: FitOutcome,
}

/// A run that survived the success filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedRun {
    pub model_id: String,
    pub group_id: String,
    pub fit: ModelFit,
}

/// Per-row prediction aligned with a group's rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub predicted: f64,
    pub residual: f64,
}

/// Unnested result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRow {
    pub model_id: String,
    pub group_id: String,
    pub elapsed: f64,
    pub measured: f64,
    pub predicted: f64,
    pub residual: f64,
}

/// One estimated parameter of one (model, group) fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefRow {
    pub model_id: String,
    pub group_id: String,
    pub param: String,
    pub estimate: f64,
    pub std_error: f64,
}

/// Fit quality diagnostics for one (model, group) fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityRow {
    pub model_id: String,
    pub group_id: String,
    pub n: usize,
    pub sse: f64,
    pub rmse: f64,
    pub aic: f64,
    pub bic: f64,
    pub iterations: usize,
}

/// A full run's configuration as understood by the pipeline.
///
/// Built from defaults, then the optional TOML file, then CLI flags.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub time_column: String,
    pub sensor_prefix: String,
    pub time_unit: TimeUnit,
    pub models: Vec<ModelSpec>,
    pub solver: SolverOptions,

    /// Also pick the best model per sensor by BIC.
    pub select_best: bool,

    pub export_flat: Option<PathBuf>,
    pub export_coefficients: Option<PathBuf>,
    pub export_pivot: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}
