use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("No available port in range {start}-{end} {location}")]
    NoAvailablePort {
        start: u16,
        end: u16,
        location: ErrorLocation,
    },

    #[error("Failed to prepare environment file at {path}: {source} {location}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Backend executable not found: {path} {location}")]
    BackendNotFound {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Failed to spawn backend process {program}: {source} {location}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Health check timeout after {elapsed_ms}ms polling {url}: {last_observed} {location}")]
    HealthTimeout {
        url: String,
        elapsed_ms: u64,
        last_observed: String,
        location: ErrorLocation,
    },

    #[error("Launch cancelled by shutdown request {location}")]
    Cancelled { location: ErrorLocation },

    #[error("Backend already running (pid {pid}) {location}")]
    AlreadyRunning { pid: u32, location: ErrorLocation },

    #[error("Configuration invalid: {message} {location}")]
    ConfigInvalid {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

/// Coarse failure category reported to the presenting layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoAvailablePort,
    Io,
    BackendNotFound,
    SpawnFailed,
    HealthTimeout,
    Cancelled,
    Other,
}

impl FailureKind {
    pub fn recovery_hint(self) -> &'static str {
        match self {
            Self::NoAvailablePort => {
                "No free port found in the configured range. \
                   Close other applications or widen backend.port_range in desktop.toml."
            }
            Self::Io => {
                "Unable to write to the application directory. \
                   Check disk space and file permissions."
            }
            Self::BackendNotFound => {
                "The backend executable is missing. \
                   Reinstall the application or fix DSA_BACKEND_PATH."
            }
            Self::SpawnFailed => {
                "The backend could not be started. \
                   Check that the executable or interpreter is valid for this platform."
            }
            Self::HealthTimeout => {
                "The backend did not become ready in time. \
                   Check logs/desktop.log and your .env settings, then restart."
            }
            Self::Cancelled => "Startup was interrupted by shutdown.",
            Self::Other => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl SupervisorError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoAvailablePort { .. } => FailureKind::NoAvailablePort,
            Self::EnvFile { .. } | Self::Io { .. } => FailureKind::Io,
            Self::BackendNotFound { .. } => FailureKind::BackendNotFound,
            Self::SpawnFailed { .. } => FailureKind::SpawnFailed,
            Self::HealthTimeout { .. } => FailureKind::HealthTimeout,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::AlreadyRunning { .. } | Self::ConfigInvalid { .. } | Self::Http { .. } => {
                FailureKind::Other
            }
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::ConfigInvalid { .. } => {
                "desktop.toml has invalid settings. \
                   Fix them or delete the file to restore defaults."
            }
            _ => self.kind().recovery_hint(),
        }
    }

    #[track_caller]
    pub fn no_available_port(start: u16, end: u16) -> Self {
        Self::NoAvailablePort {
            start,
            end,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn env_file(path: PathBuf, source: std::io::Error) -> Self {
        Self::EnvFile {
            path,
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn backend_not_found(path: PathBuf) -> Self {
        Self::BackendNotFound {
            path,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn spawn_failed(program: PathBuf, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program,
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn health_timeout(url: impl Into<String>, elapsed_ms: u64, last_observed: String) -> Self {
        Self::HealthTimeout {
            url: url.into(),
            elapsed_ms,
            last_observed,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn cancelled() -> Self {
        Self::Cancelled {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn already_running(pid: u32) -> Self {
        Self::AlreadyRunning {
            pid,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for SupervisorError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
