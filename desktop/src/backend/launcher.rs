//! Backend executable resolution and spawning.

use crate::AppPaths;
use crate::backend::terminate::hide_console_window;
use crate::backend::{
    BackendHandle, BackendSettings, DesktopLog, KillStrategy, LaunchConfig, SupervisorError,
    SupervisorResult,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

pub const VAR_ENV_FILE: &str = "ENV_FILE";
pub const VAR_DATABASE_PATH: &str = "DATABASE_PATH";
pub const VAR_LOG_DIR: &str = "LOG_DIR";
pub const VAR_UTF8: &str = "PYTHONUTF8";
pub const VAR_SCHEDULE_ENABLED: &str = "SCHEDULE_ENABLED";
pub const VAR_WEBUI_ENABLED: &str = "WEBUI_ENABLED";

const BUNDLED_DIR: &str = "backend";
const DEFAULT_INTERPRETER: &str = "python";

/// Where the backend executable came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSource {
    /// Explicit path from `DSA_BACKEND_PATH` or `backend.executable`
    Override(PathBuf),
    /// Executable shipped under `<resources>/backend/`
    Bundled(PathBuf),
    /// Development fallback: interpreter running the entry-point script
    Interpreter { interpreter: PathBuf, script: PathBuf },
}

impl BackendSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Override(_) => "override",
            Self::Bundled(_) => "bundled",
            Self::Interpreter { .. } => "interpreter",
        }
    }
}

/// Fully resolved command line for one launch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub source: BackendSource,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Variables layered on top of the inherited environment
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
}

pub struct ProcessLauncher {
    settings: BackendSettings,
    paths: AppPaths,
    #[cfg_attr(not(unix), allow(dead_code))]
    kill_strategy: KillStrategy,
}

impl ProcessLauncher {
    pub fn new(settings: BackendSettings, paths: AppPaths, kill_strategy: KillStrategy) -> Self {
        Self {
            settings,
            paths,
            kill_strategy,
        }
    }

    /// Resolve and start the backend for `config`.
    pub fn launch(&self, config: &LaunchConfig, log: &DesktopLog) -> SupervisorResult<BackendHandle> {
        let plan = self.resolve(config)?;
        log.line(format!(
            "Launching backend ({}): {} {} (cwd {})",
            plan.source.label(),
            plan.program.display(),
            plan.args.join(" "),
            plan.working_dir.display()
        ));
        self.spawn(&plan, log)
    }

    /// Pick the executable and build arguments, environment and working dir.
    ///
    /// Override and bundled paths must exist on disk; a missing file is
    /// reported as `BackendNotFound` without touching the OS spawn path.
    pub fn resolve(&self, config: &LaunchConfig) -> SupervisorResult<LaunchPlan> {
        let source = self.resolve_source();
        let mut args = Vec::new();

        let (program, working_dir) = match &source {
            BackendSource::Override(path) | BackendSource::Bundled(path) => {
                if !path.exists() {
                    return Err(SupervisorError::backend_not_found(path.clone()));
                }
                // The child runs from its own directory, so a relative
                // program path would no longer resolve after the chdir.
                let program = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
                let working_dir = executable_dir(&program);
                (program, working_dir)
            }
            BackendSource::Interpreter {
                interpreter,
                script,
            } => {
                args.push(script.to_string_lossy().into_owned());
                (interpreter.clone(), self.paths.project_root.clone())
            }
        };

        args.extend([
            "--serve-only".to_string(),
            "--host".to_string(),
            self.settings.host.clone(),
            "--port".to_string(),
            config.port().to_string(),
        ]);

        Ok(LaunchPlan {
            source,
            program,
            args,
            env: Self::build_env(config),
            working_dir,
        })
    }

    fn resolve_source(&self) -> BackendSource {
        if let Some(path) = &self.settings.executable {
            return BackendSource::Override(path.clone());
        }

        if self.paths.packaged {
            let exe_name = format!("{}{}", self.settings.bundled_name, std::env::consts::EXE_SUFFIX);
            return BackendSource::Bundled(self.paths.resources_dir.join(BUNDLED_DIR).join(exe_name));
        }

        BackendSource::Interpreter {
            interpreter: PathBuf::from(
                self.settings
                    .interpreter
                    .as_deref()
                    .unwrap_or(DEFAULT_INTERPRETER),
            ),
            script: self.paths.project_root.join(&self.settings.script),
        }
    }

    /// Environment overlay for the child.
    ///
    /// `extra_env` goes in first so the contract variables always win.
    pub fn build_env(config: &LaunchConfig) -> BTreeMap<String, String> {
        let mut env = config.extra_env().clone();

        env.insert(VAR_ENV_FILE.into(), path_string(config.env_file_path()));
        env.insert(VAR_DATABASE_PATH.into(), path_string(config.database_path()));
        env.insert(VAR_LOG_DIR.into(), path_string(config.log_directory()));
        env.insert(VAR_UTF8.into(), "1".into());
        // Scheduling and the web UI belong to the desktop shell.
        env.insert(VAR_SCHEDULE_ENABLED.into(), "false".into());
        env.insert(VAR_WEBUI_ENABLED.into(), "false".into());

        env
    }

    fn spawn(&self, plan: &LaunchPlan, log: &DesktopLog) -> SupervisorResult<BackendHandle> {
        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args)
            .envs(&plan.env)
            .current_dir(&plan.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        hide_console_window(&mut cmd);

        #[cfg(unix)]
        if self.kill_strategy.needs_process_group() {
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .map_err(|e| SupervisorError::spawn_failed(plan.program.clone(), e))?;

        let handle = BackendHandle::watch(child, plan.program.clone(), log)?;
        info!("Spawned backend with PID {}", handle.pid());

        Ok(handle)
    }
}

fn executable_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
