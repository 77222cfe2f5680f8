mod backend_handle;
mod backend_settings;
mod config;
mod desktop_log;
pub(crate) mod env_file;
mod error;
mod health;
mod health_settings;
mod launch_config;
mod launcher;
mod lifecycle;
mod logging_settings;
mod port;
mod supervisor_state;
mod supervisor_status;
mod terminate;
mod termination_settings;

pub use backend_handle::{BackendExit, BackendHandle};
pub use backend_settings::BackendSettings;
pub use config::{
    CONFIG_FILENAME, CONFIG_VERSION, DesktopConfig, ENV_BACKEND_PATH, ENV_LOG_LEVEL, ENV_PYTHON,
};
pub use desktop_log::{DesktopLog, LOG_DIR, LOG_FILENAME};
pub use env_file::{ENV_FILENAME, ENV_TEMPLATE_FILENAME, EnvBootstrapper};
pub use error::{FailureKind, Result as SupervisorResult, SupervisorError};
pub use health::{HealthProbe, HealthState, HealthWaiter, HttpProbe, ProbeOutcome};
pub use health_settings::HealthSettings;
pub use launch_config::LaunchConfig;
pub use launcher::{
    BackendSource, LaunchPlan, ProcessLauncher, VAR_DATABASE_PATH, VAR_ENV_FILE, VAR_LOG_DIR,
    VAR_SCHEDULE_ENABLED, VAR_UTF8, VAR_WEBUI_ENABLED,
};
pub use lifecycle::{ProcessSupervisor, TerminationOutcome, TerminationTask};
pub use logging_settings::LoggingSettings;
pub use port::PortAllocator;
pub use supervisor_state::SupervisorState;
pub use supervisor_status::{SupervisorStatus, build_status};
pub use terminate::{KillStrategy, ProcessTerminator, SignalTerminator, TreeKillTerminator};
pub use termination_settings::TerminationSettings;
