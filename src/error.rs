use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run. Numerical edge cases are never reported through here.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("pair coefficients for ({first}, {second}) {problem}")]
    PairCoefficients { first: String, second: String, problem: &'static str },

    #[error("unknown material '{0}'")]
    UnknownMaterial(String),

    #[error("restart data line {line}: {message}")]
    Restart { line: usize, message: String },
}

impl SimulationError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimulationError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
