use crate::backend::config::{
    default_health_interval, default_health_request_timeout, default_health_timeout,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Wall-clock budget for the backend to answer 200 (milliseconds)
    #[serde(default = "default_health_timeout")]
    pub timeout_ms: u64,

    /// Delay between polls (milliseconds)
    #[serde(default = "default_health_interval")]
    pub interval_ms: u64,

    /// Per-request HTTP timeout (milliseconds)
    #[serde(default = "default_health_request_timeout")]
    pub request_timeout_ms: u64,
}

impl HealthSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_health_timeout(),
            interval_ms: default_health_interval(),
            request_timeout_ms: default_health_request_timeout(),
        }
    }
}
