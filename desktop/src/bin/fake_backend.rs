//! Stand-in backend for exercising the supervisor end to end.
//!
//! Speaks the same command-line and HTTP contract as the real backend:
//! `--serve-only --host <h> --port <p>`, `GET /api/health`. Behaviour is
//! tuned through environment variables:
//!
//! - `FAKE_BACKEND_READY_DELAY_MS`: answer 503 until this much time has passed
//! - `FAKE_BACKEND_MODE=never-listen`: never bind the port
//! - `FAKE_BACKEND_MODE=ignore-term`: keep running after SIGTERM
//! - `FAKE_BACKEND_MODE=spawn-child`: start a long `sleep` child and print its pid

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use clap::Parser;
use tokio::time::Instant;

const READY_DELAY_VAR: &str = "FAKE_BACKEND_READY_DELAY_MS";
const MODE_VAR: &str = "FAKE_BACKEND_MODE";

/// Variables the supervisor is expected to hand over.
const CONTRACT_VARS: &[&str] = &[
    "ENV_FILE",
    "DATABASE_PATH",
    "LOG_DIR",
    "PYTHONUTF8",
    "SCHEDULE_ENABLED",
    "WEBUI_ENABLED",
];

#[derive(Debug, Parser)]
#[command(name = "dsa-fake-backend")]
struct Args {
    #[arg(long)]
    serve_only: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long)]
    port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    NeverListen,
    IgnoreTerm,
    SpawnChild,
}

impl Mode {
    fn from_env() -> Self {
        match std::env::var(MODE_VAR).as_deref() {
            Ok("never-listen") => Self::NeverListen,
            Ok("ignore-term") => Self::IgnoreTerm,
            Ok("spawn-child") => Self::SpawnChild,
            _ => Self::Normal,
        }
    }
}

struct AppState {
    ready_at: Instant,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mode = Mode::from_env();
    let delay = std::env::var(READY_DELAY_VAR)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_default();

    println!(
        "fake backend starting: serve_only={} host={} port={} mode={mode:?}",
        args.serve_only, args.host, args.port
    );
    eprintln!("fake backend diagnostics on stderr");

    if mode == Mode::IgnoreTerm {
        ignore_sigterm()?;
    }

    if mode == Mode::SpawnChild {
        let child = std::process::Command::new("sleep").arg("300").spawn()?;
        println!("fake backend child pid {}", child.id());
    }

    if mode == Mode::NeverListen {
        std::future::pending::<()>().await;
    }

    let state = Arc::new(AppState {
        ready_at: Instant::now() + delay,
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/env", get(contract_env))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    println!("fake backend listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> StatusCode {
    if Instant::now() >= state.ready_at {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn contract_env() -> Json<BTreeMap<String, String>> {
    let vars = CONTRACT_VARS
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
        .collect();
    Json(vars)
}

#[cfg(unix)]
fn ignore_sigterm() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        while term.recv().await.is_some() {
            println!("fake backend ignoring SIGTERM");
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn ignore_sigterm() -> std::io::Result<()> {
    Ok(())
}
