//! Tracing subscriber setup shared by the CLI and the dashboard.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to a file; used by the terminal UI, which owns stdout/stderr.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `pricecast_runner=debug`.
    pub log_level: String,
    pub target: LogTarget,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("cannot open log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

impl LoggingConfig {
    /// `RUST_LOG` (default `info`), logging to stderr.
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            target: LogTarget::Stderr,
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = LogTarget::File(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        EnvFilter::try_new(&self.log_level)
            .map(|_| ())
            .map_err(|e| LoggingError::InvalidFilter {
                filter: self.log_level.clone(),
                reason: e.to_string(),
            })
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    config.validate()?;
    let filter = EnvFilter::new(&config.log_level);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match &config.target {
        LogTarget::Stderr => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Io {
                    path: path.clone(),
                    source,
                })?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
    };
    installed.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(level = %config.log_level, target = ?config.target, "logging initialized");
    Ok(())
}
