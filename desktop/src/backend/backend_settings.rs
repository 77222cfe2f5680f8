use crate::backend::config::{
    default_bundled_name, default_health_path, default_host, default_port_range, default_script,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Host the backend binds to (always loopback)
    #[serde(default = "default_host")]
    pub host: String,

    /// Inclusive range probed for a free port
    #[serde(default = "default_port_range")]
    pub port_range: (u16, u16),

    /// Path polled until the backend answers 200
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Explicit backend executable, overrides bundled and dev resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Interpreter used in development mode (defaults to `python`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    /// Entry-point script relative to the project root
    #[serde(default = "default_script")]
    pub script: String,

    /// Bundled executable name under `<resources>/backend/`, without extension
    #[serde(default = "default_bundled_name")]
    pub bundled_name: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port_range: default_port_range(),
            health_path: default_health_path(),
            executable: None,
            interpreter: None,
            script: default_script(),
            bundled_name: default_bundled_name(),
        }
    }
}
