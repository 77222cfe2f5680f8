use crate::backend::{FailureKind, HealthState, SupervisorState};

use serde::Serialize;

/// Snapshot handed to the presenting layer.
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorStatus {
    pub state: String,
    pub port: Option<u16>,
    pub url: Option<String>,
    pub pid: Option<u32>,
    pub health: HealthState,
    pub failure_kind: Option<FailureKind>,
    pub error: Option<String>,
    pub recovery_hint: Option<String>,
    pub is_ready: bool,
}

/// Converts internal supervisor state to the frontend-facing status.
pub fn build_status(
    state: &SupervisorState,
    port: Option<u16>,
    pid: Option<u32>,
    health: &HealthState,
) -> SupervisorStatus {
    let (url, failure_kind, error, recovery_hint) = match state {
        SupervisorState::Ready { url } => (Some(url.clone()), None, None, None),
        SupervisorState::Failed { kind, message } => (
            None,
            Some(*kind),
            Some(message.clone()),
            Some(kind.recovery_hint().to_string()),
        ),
        _ => (None, None, None, None),
    };

    SupervisorStatus {
        state: state.label().into(),
        port,
        is_ready: url.is_some() && *health == HealthState::Healthy,
        url,
        pid,
        health: health.clone(),
        failure_kind,
        error,
        recovery_hint,
    }
}
