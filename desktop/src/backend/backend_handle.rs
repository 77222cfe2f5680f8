use crate::backend::{DesktopLog, SupervisorError, SupervisorResult};

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::watch;

const OUTPUT_PREFIX: &str = "[backend]";

/// How the backend process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendExit {
    /// Exit code, `None` when the process was ended by a signal
    pub code: Option<i32>,
}

/// The running backend process.
///
/// The `Child` itself is moved into a waiter task that reaps it and
/// publishes the exit through a watch channel; this handle only keeps the
/// pid and that channel. Termination goes through the supervisor.
#[derive(Debug)]
pub struct BackendHandle {
    pid: u32,
    program: PathBuf,
    exit_rx: watch::Receiver<Option<BackendExit>>,
}

impl BackendHandle {
    /// Take ownership of a freshly spawned child: pipe its output into the
    /// desktop log and start watching for its exit.
    ///
    /// Fails if the child has already been reaped, since there would be no
    /// pid left to signal.
    pub(crate) fn watch(
        mut child: Child,
        program: PathBuf,
        log: &DesktopLog,
    ) -> SupervisorResult<Self> {
        let Some(pid) = child.id() else {
            return Err(SupervisorError::spawn_failed(
                program,
                std::io::Error::other("process exited before its pid could be read"),
            ));
        };

        let (exit_tx, exit_rx) = watch::channel(None);

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, log.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, log.clone());
        }

        let log = log.clone();
        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => {
                    match status.code() {
                        Some(code) => log.line(format!("{OUTPUT_PREFIX} exited with code {code}")),
                        None => log.line(format!("{OUTPUT_PREFIX} exited ({status})")),
                    }
                    BackendExit {
                        code: status.code(),
                    }
                }
                Err(e) => {
                    log.line(format!("{OUTPUT_PREFIX} wait failed: {e}"));
                    BackendExit { code: None }
                }
            };
            let _ = exit_tx.send(Some(exit));
        });

        Ok(Self {
            pid,
            program,
            exit_rx,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn is_alive(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    pub fn exit(&self) -> Option<BackendExit> {
        *self.exit_rx.borrow()
    }

    /// Resolve once the process has exited.
    pub async fn wait_exit(&self) -> Option<BackendExit> {
        let mut rx = self.exit_rx.clone();
        rx.wait_for(Option::is_some).await.ok().and_then(|exit| *exit)
    }
}

/// Copy every line of `reader` into the desktop log until EOF.
fn forward_output<R>(reader: R, log: DesktopLog)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let text = text.trim_end();
                    if !text.is_empty() {
                        log.line(format!("{OUTPUT_PREFIX} {text}"));
                    }
                }
            }
        }
    });
}
