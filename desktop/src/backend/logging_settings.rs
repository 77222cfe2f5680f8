use crate::backend::config::{default_log_level, default_log_retention};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Number of daily diagnostic log files to keep
    #[serde(default = "default_log_retention")]
    pub retention_days: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            retention_days: default_log_retention(),
        }
    }
}
