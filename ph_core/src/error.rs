use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("clock skew: sample at {got_ms} ms is earlier than latest stored sample at {latest_ms} ms")]
    ClockSkew { latest_ms: i64, got_ms: i64 },
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing pH probe")]
    MissingProbe,
    #[error("missing target provider")]
    MissingTargets,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
