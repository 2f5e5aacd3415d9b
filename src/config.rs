//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `--config <PATH>`
//! 2. `$SENSORFIT_CONFIG` (a `.env` file in the working directory is honored)
//! 3. Built-in defaults (everything is optional)
//!
//! CLI flags override whatever the file sets.
//!
//! ```toml
//! [input]
//! time_column = "time"
//! sensor_prefix = "temperature_"
//! time_unit = "hours"
//!
//! [solver]
//! max_iterations = 100
//!
//! [models]
//! enabled = ["exponential", "convection"]
//!
//! [models.initial]
//! convection = [5.0, 1.0, 0.2]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{ModelKind, ModelSpec, SolverOptions, TimeUnit};

pub const CONFIG_ENV: &str = "SENSORFIT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown model `{0}` in [models.initial]")]
    UnknownModel(String),

    #[error("model `{0}` is listed more than once in [models] enabled")]
    DuplicateModel(String),

    #[error("model `{model}` expects {expected} initial values, got {got}")]
    BadInitial {
        model: String,
        expected: usize,
        got: usize,
    },
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub solver: SolverOptions,
    pub models: ModelsConfig,
}

/// Input table layout.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub time_column: String,
    pub sensor_prefix: String,
    pub time_unit: TimeUnit,
}

/// Which models run, and from where.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub enabled: Vec<ModelKind>,
    /// Initial guesses keyed by model id.
    pub initial: BTreeMap<String, Vec<f64>>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            time_column: "time".into(),
            sensor_prefix: "temperature_".into(),
            time_unit: TimeUnit::Hours,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            enabled: ModelKind::ALL.to_vec(),
            initial: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from an explicit path, the environment, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!(path = %path.display(), "loaded config");
                Self::parse(&text)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (i, kind) in self.models.enabled.iter().enumerate() {
            if self.models.enabled[..i].contains(kind) {
                return Err(ConfigError::DuplicateModel(kind.id().to_string()));
            }
        }
        for (id, values) in &self.models.initial {
            let kind = kind_for_id(id).ok_or_else(|| ConfigError::UnknownModel(id.clone()))?;
            if values.len() != kind.param_count() {
                return Err(ConfigError::BadInitial {
                    model: id.clone(),
                    expected: kind.param_count(),
                    got: values.len(),
                });
            }
        }
        Ok(())
    }

    /// Model specs for `kinds`, with configured initial guesses applied.
    pub fn model_specs(&self, kinds: &[ModelKind]) -> Vec<ModelSpec> {
        kinds
            .iter()
            .map(|&kind| {
                let spec = ModelSpec::new(kind);
                match self.models.initial.get(kind.id()) {
                    Some(initial) => spec.with_initial(initial.clone()),
                    None => spec,
                }
            })
            .collect()
    }
}

fn kind_for_id(id: &str) -> Option<ModelKind> {
    ModelKind::ALL.into_iter().find(|k| k.id() == id)
}
