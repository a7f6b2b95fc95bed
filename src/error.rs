//! Error types for stevedore

use std::path::PathBuf;

use thiserror::Error;

/// Result type for stevedore operations
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Everything that can go wrong between reading the compose file and talking to the daemon
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Cannot read compose file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Compose file {path} is malformed: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Cannot determine a project name from {0}")]
    Project(String),

    #[error("Cannot connect to the Docker daemon: {0}")]
    Connection(#[source] bollard::errors::Error),

    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Log stream error: {0}")]
    LogStream(String),

    #[error("No container found for service {0}")]
    ServiceNotFound(String),

    #[error("Command `{0}` is not supported")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
