use std::path::PathBuf;

use thiserror::Error;

use crate::dynamics::mode::PoweredMode;

// ---------------------------------------------------------------------------
// Load-time errors (configuration document and input tables)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("table {path} has no column named `{column}`")]
    MissingColumn { path: PathBuf, column: String },

    #[error("malformed table {name}: {reason}")]
    MalformedTable { name: String, reason: String },

    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

// ---------------------------------------------------------------------------
// Run-time errors (propagation)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SimError {
    #[error("{table} lookup out of range: {axis} = {value} not in [{min}, {max}]")]
    TableDomain {
        table: String,
        axis: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("powered flight mode `{0}` is not supported")]
    UnsupportedFlightMode(PoweredMode),

    #[error("mass of {segment} became non-positive ({mass:.3} kg) at t = {time:.3} s")]
    NonPositiveMass {
        segment: String,
        time: f64,
        mass: f64,
    },

    #[error("integrator step size underflow at t = {time} s (h = {step:e})")]
    StepSizeUnderflow { time: f64, step: f64 },

    #[error("failed to write trajectory output: {0}")]
    Output(#[from] csv::Error),

    /// Opening, flushing or unwrapping an output stream.
    #[error("trajectory output stream failed: {0}")]
    OutputIo(#[from] std::io::Error),
}
