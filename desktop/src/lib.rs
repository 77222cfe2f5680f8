pub mod backend;
pub mod logging;
mod paths;

pub use paths::AppPaths;

#[cfg(test)]
mod tests;

use backend::{DesktopConfig, DesktopLog, ProcessSupervisor, SupervisorState};
use logging::{current_log_path, setup_logging};

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

/// Launch the stock analysis backend and keep it running until interrupted.
#[derive(Debug, Parser)]
#[command(name = "dsa-desktop", version, about)]
pub struct Cli {
    /// Writable state directory (.env, data/, logs/, desktop.toml)
    #[arg(long, env = "DSA_APP_DIR")]
    pub app_dir: Option<PathBuf>,

    /// Packaged resources directory (backend/, .env.example)
    #[arg(long)]
    pub resources_dir: Option<PathBuf>,

    /// Source checkout used to run the backend script in development
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Treat the resources directory as an installed distribution
    #[arg(long)]
    pub packaged: bool,

    /// Backend executable, overrides every other resolution rule
    #[arg(long)]
    pub backend: Option<PathBuf>,
}

impl Cli {
    /// Merge explicit flags over the detected layout.
    pub fn resolve_paths(&self) -> std::io::Result<AppPaths> {
        let mut paths = AppPaths::detect()?;

        if let Some(dir) = &self.app_dir {
            paths.app_dir = dir.clone();
        }
        if let Some(dir) = &self.project_root {
            paths.project_root = dir.clone();
            if !paths.packaged {
                paths.resources_dir = dir.clone();
            }
        }
        if let Some(dir) = &self.resources_dir {
            paths.resources_dir = dir.clone();
        }
        if self.packaged {
            paths.packaged = true;
        }

        Ok(paths)
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let paths = cli.resolve_paths()?;
    if let Err(e) = std::fs::create_dir_all(&paths.app_dir) {
        eprintln!("Cannot create app directory {}: {e}", paths.app_dir.display());
    }

    // Opened before anything else can fail so startup errors reach the log.
    let log = DesktopLog::open(&paths.app_dir);
    log.line("Desktop app starting");

    let mut config = DesktopConfig::load_or_default(&paths.app_dir, &log);
    if let Some(backend) = &cli.backend {
        config.backend.executable = Some(backend.clone());
    }

    if let Err(e) = setup_logging(&paths.app_dir, &config.logging) {
        eprintln!("Diagnostic logging unavailable: {e}");
    }

    info!("Starting dsa-desktop v{}", env!("CARGO_PKG_VERSION"));
    info!("App directory: {}", paths.app_dir.display());
    info!("Diagnostic log: {}", current_log_path(&paths.app_dir).display());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(paths, config, log))
}

async fn serve(
    paths: AppPaths,
    config: DesktopConfig,
    log: DesktopLog,
) -> Result<(), Box<dyn std::error::Error>> {
    let supervisor = Arc::new(ProcessSupervisor::new(paths, config, log)?);

    // Forward state changes to the presenting layer (stdout here).
    let mut state_rx = supervisor.subscribe();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = state_rx.borrow_and_update().clone();
            info!("Supervisor state: {}", state.label());
            if let SupervisorState::Failed { message, .. } = &state {
                error!("{message}");
            }
        }
    });

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tokio::select! {
        result = supervisor.launch() => {
            match result {
                Ok(url) => println!("Backend ready: {url}"),
                Err(e) => {
                    // Keep running so the user can read the error.
                    eprintln!("Backend failed to start: {e}\n\nHint: {}", e.recovery_hint());
                }
            }
            println!("{}", serde_json::to_string_pretty(&supervisor.status())?);
            shutdown.await;
        }
        _ = &mut shutdown => {}
    }

    info!("Shutdown requested, stopping backend");
    if let Some(task) = supervisor.stop() {
        match task.wait().await {
            Some(outcome) => info!("Backend stopped: {outcome:?}"),
            None => error!("Termination task did not complete"),
        }
    }

    Ok(())
}

/// Resolve on SIGINT/SIGTERM (Ctrl+C on Windows).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let (tx, rx) = tokio::sync::oneshot::channel();
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to register signal handlers: {e}");
                return std::future::pending().await;
            }
        };

        std::thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {sig}, shutting down...");
                let _ = tx.send(());
            }
        });

        let _ = rx.await;
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
