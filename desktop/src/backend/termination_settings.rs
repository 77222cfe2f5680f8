use crate::backend::KillStrategy;
use crate::backend::config::{default_grace_period, default_kill_strategy};

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationSettings {
    /// Time allowed between the graceful request and the forced kill (milliseconds)
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,

    /// `signal` (SIGTERM then SIGKILL) or `tree_kill` (whole process tree)
    #[serde(default = "default_kill_strategy")]
    pub strategy: KillStrategy,
}

impl TerminationSettings {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for TerminationSettings {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period(),
            strategy: default_kill_strategy(),
        }
    }
}
