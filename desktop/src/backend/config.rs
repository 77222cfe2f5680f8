//! Desktop configuration with validation and versioning.

use crate::backend::{
    BackendSettings, DesktopLog, HealthSettings, KillStrategy, LoggingSettings, SupervisorError,
    SupervisorResult, TerminationSettings,
};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration version for migration support.
/// Increment when adding new fields or changing structure.
pub const CONFIG_VERSION: u32 = 2;

pub const CONFIG_FILENAME: &str = "desktop.toml";

pub const ENV_BACKEND_PATH: &str = "DSA_BACKEND_PATH";
pub const ENV_PYTHON: &str = "DSA_PYTHON";
pub const ENV_LOG_LEVEL: &str = "DSA_LOG_LEVEL";

pub(crate) const LOOPBACK_HOST: &str = "127.0.0.1";
const DEFAULT_PORT_RANGE_START: u16 = 8000;
const DEFAULT_PORT_RANGE_END: u16 = 8100;
const DEFAULT_HEALTH_PATH: &str = "/api/health";
const DEFAULT_SCRIPT: &str = "main.py";
const DEFAULT_BUNDLED_NAME: &str = "stock_analysis";
const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_HEALTH_INTERVAL_MS: u64 = 800;
const DEFAULT_HEALTH_REQUEST_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_GRACE_PERIOD_MS: u64 = 3_000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_RETENTION_DAYS: usize = 7;

const MIN_PORT: u16 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopConfig {
    /// Config file format version
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub health: HealthSettings,

    #[serde(default)]
    pub termination: TerminationSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

// === Default Value Functions ===

fn default_version() -> u32 {
    CONFIG_VERSION
}
pub(crate) fn default_host() -> String {
    LOOPBACK_HOST.into()
}
pub(crate) fn default_port_range() -> (u16, u16) {
    (DEFAULT_PORT_RANGE_START, DEFAULT_PORT_RANGE_END)
}
pub(crate) fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.into()
}
pub(crate) fn default_script() -> String {
    DEFAULT_SCRIPT.into()
}
pub(crate) fn default_bundled_name() -> String {
    DEFAULT_BUNDLED_NAME.into()
}
pub(crate) fn default_health_timeout() -> u64 {
    DEFAULT_HEALTH_TIMEOUT_MS
}
pub(crate) fn default_health_interval() -> u64 {
    DEFAULT_HEALTH_INTERVAL_MS
}
pub(crate) fn default_health_request_timeout() -> u64 {
    DEFAULT_HEALTH_REQUEST_TIMEOUT_MS
}
pub(crate) fn default_grace_period() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}
pub(crate) fn default_kill_strategy() -> KillStrategy {
    KillStrategy::platform_default()
}
pub(crate) fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}
pub(crate) fn default_log_retention() -> usize {
    DEFAULT_LOG_RETENTION_DAYS
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: BackendSettings::default(),
            health: HealthSettings::default(),
            termination: TerminationSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// === Configuration Operations ===

impl DesktopConfig {
    /// Load config from `<app_dir>/desktop.toml`, creating defaults if absent.
    ///
    /// Environment overrides are applied after the file is read and are
    /// never written back.
    pub fn load_or_create(app_dir: &Path) -> SupervisorResult<Self> {
        let config_path = Self::path(app_dir);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Self = toml::from_str(&content).map_err(|e| {
                SupervisorError::config_invalid(format!("{}: {e}", config_path.display()))
            })?;

            if config.version < CONFIG_VERSION {
                config = Self::migrate(config);
                config.save(app_dir)?;
            }
            config
        } else {
            std::fs::create_dir_all(app_dir)?;
            let config = Self::default();
            config.save(app_dir)?;
            info!("Wrote default configuration to {}", config_path.display());
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Like [`Self::load_or_create`], but a broken config never stops the app.
    ///
    /// The error and its recovery hint go to `desktop.log` and defaults
    /// (plus environment overrides) are used instead. The file on disk is
    /// left untouched so the user can fix it.
    pub fn load_or_default(app_dir: &Path, log: &DesktopLog) -> Self {
        match Self::load_or_create(app_dir) {
            Ok(config) => config,
            Err(e) => {
                warn!("Falling back to default configuration: {e}");
                log.line(format!("Configuration error: {e}"));
                log.line(format!("Hint: {}", e.recovery_hint()));
                log.line("Using default configuration");

                let mut config = Self::default();
                config.apply_env_overrides();
                if config.validate().is_err() {
                    config = Self::default();
                }
                config
            }
        }
    }

    pub fn path(app_dir: &Path) -> PathBuf {
        app_dir.join(CONFIG_FILENAME)
    }

    /// Save config to file atomically.
    ///
    /// Uses write-to-temp-then-rename so an interrupted write never
    /// leaves a truncated config behind.
    pub fn save(&self, app_dir: &Path) -> SupervisorResult<()> {
        let config_path = Self::path(app_dir);
        let content = toml::to_string_pretty(self)
            .map_err(|e| SupervisorError::config_invalid(e.to_string()))?;

        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> Self {
        // Version 1 -> 2: termination settings were added
        if config.version <= 1 {
            config.termination = TerminationSettings::default();
            config.version = 2;
        }

        config
    }

    /// Apply `DSA_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = non_empty_var(ENV_BACKEND_PATH) {
            self.backend.executable = Some(PathBuf::from(path));
        }
        if let Some(python) = non_empty_var(ENV_PYTHON) {
            self.backend.interpreter = Some(python);
        }
        if let Some(level) = non_empty_var(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> SupervisorResult<()> {
        let (start, end) = self.backend.port_range;

        if start < MIN_PORT {
            return Err(SupervisorError::config_invalid(format!(
                "Port range must start at >= {MIN_PORT} (unprivileged)"
            )));
        }

        if start > end {
            return Err(SupervisorError::config_invalid(
                "Invalid port range: start > end",
            ));
        }

        if self.backend.host != LOOPBACK_HOST {
            return Err(SupervisorError::config_invalid(format!(
                "Backend host must be {LOOPBACK_HOST}"
            )));
        }

        if !self.backend.health_path.starts_with('/') {
            return Err(SupervisorError::config_invalid(
                "Health path must start with '/'",
            ));
        }

        if self.health.timeout_ms == 0 || self.health.interval_ms == 0 {
            return Err(SupervisorError::config_invalid(
                "Health timeout and interval must be > 0",
            ));
        }

        if self.health.request_timeout_ms == 0 {
            return Err(SupervisorError::config_invalid(
                "Health request timeout must be > 0",
            ));
        }

        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
