//! Synthetic data generation.

pub mod sample;

pub use sample::{SampleConfig, SampleData, SensorTruth, generate_wide};
