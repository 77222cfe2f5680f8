use crate::backend::FailureKind;

/// Where the supervisor is in the launch sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    /// Nothing launched yet
    Idle,
    /// Probing for a free port
    Allocating,
    /// Preparing the `.env` file
    Bootstrapping,
    /// Resolving and spawning the backend
    Launching,
    /// Backend spawned, polling its health endpoint
    AwaitingHealth { port: u16 },
    /// Backend answered 200; `url` is ready to load
    Ready { url: String },
    /// Launch attempt failed
    Failed { kind: FailureKind, message: String },
    /// Backend termination has been requested
    Stopped,
}

impl SupervisorState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Allocating => "allocating",
            Self::Bootstrapping => "bootstrapping",
            Self::Launching => "launching",
            Self::AwaitingHealth { .. } => "awaiting_health",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
            Self::Stopped => "stopped",
        }
    }

    /// Ready, Failed and Stopped end a launch attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Ready { .. } | Self::Failed { .. } | Self::Stopped
        )
    }
}
