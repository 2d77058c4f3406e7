use crate::sensors::SensorId;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not connect to {label} database: {reason}")]
    Connect { label: String, reason: String },

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("gave up connecting to {label} database after {attempts} attempts")]
    ConnectGaveUp { label: String, attempts: u32 },

    #[error("operation cancelled by shutdown")]
    Cancelled,

    #[error("data acquisition not ready after {0:?}")]
    NotReady(Duration),

    #[error("sensor {0} is not configured")]
    UnknownSensor(SensorId),
}

pub type Result<T> = std::result::Result<T, Error>;
