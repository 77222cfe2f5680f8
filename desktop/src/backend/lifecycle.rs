//! Backend process lifecycle: launch sequence and termination.

use crate::AppPaths;
use crate::backend::{
    BackendExit, BackendHandle, DesktopConfig, DesktopLog, EnvBootstrapper, HealthProbe,
    HealthState, HealthWaiter, HttpProbe, LaunchConfig, PortAllocator, ProcessLauncher,
    ProcessTerminator, SupervisorError, SupervisorResult, SupervisorState, SupervisorStatus,
    build_status,
};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Upper bound on waiting for the exit notification after a forced kill.
const POST_KILL_WAIT: Duration = Duration::from_secs(5);

/// Owns the single backend process of this application.
///
/// Responsibilities:
/// - Run the launch sequence (port, `.env`, spawn, health)
/// - Publish state changes to subscribers
/// - Terminate the backend, gracefully first and forcefully after a grace period
///
/// The OS process is never exposed; callers see the pid at most.
pub struct ProcessSupervisor {
    paths: AppPaths,
    config: DesktopConfig,
    extra_env: BTreeMap<String, String>,
    log: DesktopLog,
    launcher: ProcessLauncher,
    waiter: HealthWaiter,
    terminator: Arc<dyn ProcessTerminator>,
    handle: Mutex<Option<BackendHandle>>,
    cancel: Mutex<CancellationToken>,
    port: Mutex<Option<u16>>,
    health: Mutex<HealthState>,
    state_tx: watch::Sender<SupervisorState>,
    state_rx: watch::Receiver<SupervisorState>,
}

/// How a termination request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The backend exited within the grace period
    Exited(Option<BackendExit>),
    /// The grace period ran out and the backend was killed
    ForceKilled(Option<BackendExit>),
}

/// Background termination started by [`ProcessSupervisor::stop`].
///
/// Dropping it lets the escalation run on its own.
pub struct TerminationTask(JoinHandle<TerminationOutcome>);

impl TerminationTask {
    /// Wait for the escalation to finish.
    pub async fn wait(self) -> Option<TerminationOutcome> {
        self.0.await.ok()
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl ProcessSupervisor {
    /// Create a supervisor using HTTP health probes.
    pub fn new(paths: AppPaths, config: DesktopConfig, log: DesktopLog) -> SupervisorResult<Self> {
        let probe = Arc::new(HttpProbe::new(config.health.request_timeout())?);
        Ok(Self::with_probe(paths, config, log, probe))
    }

    /// Create a supervisor with a custom health probe.
    pub fn with_probe(
        paths: AppPaths,
        config: DesktopConfig,
        log: DesktopLog,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SupervisorState::Idle);
        let strategy = config.termination.strategy;

        Self {
            launcher: ProcessLauncher::new(config.backend.clone(), paths.clone(), strategy),
            waiter: HealthWaiter::new(probe, config.health.timeout(), config.health.interval()),
            terminator: strategy.terminator(),
            paths,
            config,
            extra_env: BTreeMap::new(),
            log,
            handle: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
            port: Mutex::new(None),
            health: Mutex::new(HealthState::Pending),
            state_tx,
            state_rx,
        }
    }

    /// Extra variables passed to the backend on top of the contract ones.
    pub fn with_extra_env(mut self, extra_env: BTreeMap<String, String>) -> Self {
        self.extra_env = extra_env;
        self
    }

    /// Run the launch sequence and return the URL to load.
    ///
    /// On a health timeout the backend is left running; it is terminated
    /// only by [`stop`](Self::stop).
    pub async fn launch(&self) -> SupervisorResult<String> {
        if let Some(pid) = self.backend_pid() {
            return Err(SupervisorError::already_running(pid));
        }

        let cancel = CancellationToken::new();
        *lock(&self.cancel) = cancel.clone();
        *lock(&self.health) = HealthState::Pending;

        match self.run_launch(&cancel).await {
            Ok(url) => {
                *lock(&self.health) = HealthState::Healthy;
                self.log.line(format!("Backend ready at {url}"));
                self.set_state(SupervisorState::Ready { url: url.clone() });
                Ok(url)
            }
            Err(e @ SupervisorError::Cancelled { .. }) => {
                self.log.line("Launch aborted by shutdown request");
                self.release_port_if_idle();
                self.set_state(SupervisorState::Stopped);
                Err(e)
            }
            Err(e) => {
                self.release_port_if_idle();
                let message = e.to_string();
                error!("Backend launch failed: {message}");
                self.log.line(format!("Launch failed: {message}"));
                *lock(&self.health) = HealthState::Failed(message.clone());
                self.set_state(SupervisorState::Failed {
                    kind: e.kind(),
                    message,
                });
                Err(e)
            }
        }
    }

    /// A failed launch keeps its port only while a backend still holds it.
    fn release_port_if_idle(&self) {
        if self.backend_pid().is_none() {
            *lock(&self.port) = None;
        }
    }

    async fn run_launch(&self, cancel: &CancellationToken) -> SupervisorResult<String> {
        self.set_state(SupervisorState::Allocating);
        let (start, end) = self.config.backend.port_range;
        let port = PortAllocator::find_available(start, end)?;
        *lock(&self.port) = Some(port);
        self.log.line(format!("Using port {port}"));
        ensure_active(cancel)?;

        self.set_state(SupervisorState::Bootstrapping);
        let launch_config =
            LaunchConfig::for_app_dir(port, &self.paths.app_dir, self.extra_env.clone());
        EnvBootstrapper::new(Some(self.paths.env_template()))
            .ensure_env_file(launch_config.env_file_path())?;
        self.log.line(format!(
            "ENV_FILE={}",
            launch_config.env_file_path().display()
        ));
        self.log
            .line(format!("App directory={}", self.paths.app_dir.display()));
        ensure_active(cancel)?;

        self.set_state(SupervisorState::Launching);
        let handle = self.launcher.launch(&launch_config, &self.log)?;
        self.log.line(format!("Backend started with PID {}", handle.pid()));
        *lock(&self.handle) = Some(handle);

        // stop() may have run while spawning; it cancels before taking the
        // handle, so whichever side sees the other cleans up.
        if cancel.is_cancelled() {
            self.stop();
            return Err(SupervisorError::cancelled());
        }

        self.set_state(SupervisorState::AwaitingHealth { port });
        let host = &self.config.backend.host;
        let health_url = format!("http://{host}:{port}{}", self.config.backend.health_path);

        let polls = self.waiter.wait_healthy(&health_url, cancel).await?;
        info!("Health check passed after {polls} poll(s)");

        Ok(format!("http://{host}:{port}/"))
    }

    /// Request backend termination.
    ///
    /// Cancels any in-flight launch, sends the graceful request and returns
    /// immediately. If the backend has not exited when the grace period ends
    /// it is killed. Safe to call repeatedly or with nothing running; both
    /// return `None`.
    pub fn stop(&self) -> Option<TerminationTask> {
        lock(&self.cancel).cancel();

        let handle = lock(&self.handle).take()?;
        *lock(&self.port) = None;
        self.set_state(SupervisorState::Stopped);

        let pid = handle.pid();
        if !handle.is_alive() {
            self.log
                .line(format!("Backend (PID {pid}) already exited, nothing to stop"));
            return None;
        }

        let grace = self.config.termination.grace_period();
        self.log.line(format!(
            "Stopping backend (PID {pid}) via {}, grace period {}ms",
            self.terminator.name(),
            grace.as_millis()
        ));

        let terminator = self.terminator.clone();
        let log = self.log.clone();
        Some(TerminationTask(tokio::spawn(async move {
            terminate(handle, terminator, grace, log).await
        })))
    }

    fn set_state(&self, state: SupervisorState) {
        self.state_tx.send_replace(state);
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state_rx.clone()
    }

    pub fn state(&self) -> SupervisorState {
        self.state_rx.borrow().clone()
    }

    pub fn health(&self) -> HealthState {
        lock(&self.health).clone()
    }

    /// Port of the current launch attempt, if one was allocated.
    pub fn port(&self) -> Option<u16> {
        *lock(&self.port)
    }

    /// Pid of the backend while it is running.
    pub fn backend_pid(&self) -> Option<u32> {
        lock(&self.handle)
            .as_ref()
            .filter(|h| h.is_alive())
            .map(BackendHandle::pid)
    }

    pub fn status(&self) -> SupervisorStatus {
        build_status(
            &self.state(),
            self.port(),
            self.backend_pid(),
            &self.health(),
        )
    }

    pub fn log(&self) -> &DesktopLog {
        &self.log
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }
}

/// Graceful request, then race the exit notification against the grace timer.
async fn terminate(
    handle: BackendHandle,
    terminator: Arc<dyn ProcessTerminator>,
    grace: Duration,
    log: DesktopLog,
) -> TerminationOutcome {
    let pid = handle.pid();

    if let Err(e) = terminator.request_exit(pid).await {
        warn!("Graceful termination request for PID {pid} failed: {e}");
        log.line(format!("Graceful termination request for PID {pid} failed: {e}"));
    }

    tokio::select! {
        exit = handle.wait_exit() => {
            log.line(format!("Backend (PID {pid}) exited after termination request"));
            TerminationOutcome::Exited(exit)
        }
        _ = tokio::time::sleep(grace) => {
            log.line(format!(
                "Backend (PID {pid}) still running after {}ms, forcing kill",
                grace.as_millis()
            ));
            if let Err(e) = terminator.force_kill(pid).await {
                error!("Force kill of PID {pid} failed: {e}");
                log.line(format!("Force kill of PID {pid} failed: {e}"));
            }
            let exit = tokio::time::timeout(POST_KILL_WAIT, handle.wait_exit())
                .await
                .ok()
                .flatten();
            TerminationOutcome::ForceKilled(exit)
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> SupervisorResult<()> {
    if cancel.is_cancelled() {
        return Err(SupervisorError::cancelled());
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
