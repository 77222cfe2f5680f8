//! Process termination strategies.
//!
//! Both strategies are two-step: a cooperative exit request first, then a
//! forced kill if the process outlives the grace period. The supervisor
//! picks one through [`KillStrategy`] and never branches on platform itself.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillStrategy {
    /// Signal the backend pid (SIGTERM, then SIGKILL)
    Signal,
    /// Terminate the backend and every descendant
    TreeKill,
}

impl KillStrategy {
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::TreeKill
        } else {
            Self::Signal
        }
    }

    pub fn terminator(self) -> Arc<dyn ProcessTerminator> {
        match self {
            Self::Signal => Arc::new(SignalTerminator),
            Self::TreeKill => Arc::new(TreeKillTerminator),
        }
    }

    /// Whether the child must lead its own process group so the whole
    /// tree can be signalled at once (Unix only).
    pub fn needs_process_group(self) -> bool {
        matches!(self, Self::TreeKill)
    }
}

#[async_trait]
pub trait ProcessTerminator: Send + Sync {
    /// Ask the process to exit on its own.
    async fn request_exit(&self, pid: u32) -> io::Result<()>;

    /// Kill the process without giving it a chance to clean up.
    async fn force_kill(&self, pid: u32) -> io::Result<()>;

    fn name(&self) -> &'static str;
}

pub struct SignalTerminator;

pub struct TreeKillTerminator;

#[cfg(unix)]
mod imp {
    use std::io;

    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill, killpg};
    use nix::unistd::Pid;

    fn ignore_missing(result: nix::Result<()>) -> io::Result<()> {
        match result {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::from(e)),
        }
    }

    pub fn signal(pid: u32, signal: Signal) -> io::Result<()> {
        ignore_missing(kill(Pid::from_raw(pid as i32), signal))
    }

    pub fn signal_group(pid: u32, signal: Signal) -> io::Result<()> {
        ignore_missing(killpg(Pid::from_raw(pid as i32), signal))
    }
}

#[cfg(windows)]
mod imp {
    use std::io;

    use tokio::process::Command;

    /// Run `taskkill` against `pid`, optionally including children and `/F`.
    pub async fn taskkill(pid: u32, tree: bool, force: bool) -> io::Result<()> {
        let mut cmd = Command::new("taskkill");
        cmd.args(["/PID", &pid.to_string()]);
        if tree {
            cmd.arg("/T");
        }
        if force {
            cmd.arg("/F");
        }
        crate::backend::terminate::hide_console_window(&mut cmd);

        // taskkill exits non-zero when the process is already gone
        let output = cmd.output().await?;
        if !output.status.success() {
            tracing::debug!(
                "taskkill for pid {pid} returned {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessTerminator for SignalTerminator {
    async fn request_exit(&self, pid: u32) -> io::Result<()> {
        debug!("Requesting exit of pid {pid}");
        #[cfg(unix)]
        {
            imp::signal(pid, nix::sys::signal::Signal::SIGTERM)
        }
        #[cfg(windows)]
        {
            imp::taskkill(pid, false, false).await
        }
    }

    async fn force_kill(&self, pid: u32) -> io::Result<()> {
        debug!("Force killing pid {pid}");
        #[cfg(unix)]
        {
            imp::signal(pid, nix::sys::signal::Signal::SIGKILL)
        }
        #[cfg(windows)]
        {
            imp::taskkill(pid, false, true).await
        }
    }

    fn name(&self) -> &'static str {
        "signal"
    }
}

#[async_trait]
impl ProcessTerminator for TreeKillTerminator {
    async fn request_exit(&self, pid: u32) -> io::Result<()> {
        debug!("Requesting exit of process tree {pid}");
        #[cfg(unix)]
        {
            imp::signal_group(pid, nix::sys::signal::Signal::SIGTERM)
        }
        #[cfg(windows)]
        {
            imp::taskkill(pid, true, false).await
        }
    }

    async fn force_kill(&self, pid: u32) -> io::Result<()> {
        debug!("Force killing process tree {pid}");
        #[cfg(unix)]
        {
            imp::signal_group(pid, nix::sys::signal::Signal::SIGKILL)
        }
        #[cfg(windows)]
        {
            imp::taskkill(pid, true, true).await
        }
    }

    fn name(&self) -> &'static str {
        "tree_kill"
    }
}

/// Keep helper processes from flashing a console window on Windows.
#[cfg(windows)]
pub(crate) fn hide_console_window(cmd: &mut tokio::process::Command) {
    use windows_sys::Win32::System::Threading::CREATE_NO_WINDOW;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
pub(crate) fn hide_console_window(_cmd: &mut tokio::process::Command) {}
