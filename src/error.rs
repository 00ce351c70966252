use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Ways a sensor's raw output can violate the expected two-line format.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum MalformedData {
    #[error("expected 2 data lines, got {0}")]
    LineCount(usize),

    #[error("invalid data line: {0}")]
    InvalidDataLine(String),

    #[error("invalid data value: {0}")]
    InvalidValue(String),
}

/// Classified failure of a single sensor read.
#[derive(ThisError, Debug)]
pub enum SensorError {
    /// The data file could not be read (sensor unplugged, permissions, bus fault).
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sensor has not finished its conversion yet.
    #[error("not ready to read")]
    NotReady,

    #[error(transparent)]
    MalformedData(#[from] MalformedData),
}

impl SensorError {
    /// Whether retrying on the next poll is expected to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SensorError::NotReady)
    }
}

#[derive(ThisError, Debug)]
pub enum DiscoveryError {
    #[error("failed to list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no temperature sensors found in {}", .0.display())]
    NoSensors(PathBuf),

    #[error("multiple sensors not supported (found {0})")]
    MultipleSensors(usize),
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(ThisError, Debug)]
pub enum Error {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
