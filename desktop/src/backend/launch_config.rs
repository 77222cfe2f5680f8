use crate::backend::desktop_log::LOG_DIR;
use crate::backend::env_file::ENV_FILENAME;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = "data";
const DATABASE_FILENAME: &str = "stock_analysis.db";

/// Per-attempt inputs for the backend process.
///
/// Built fresh for every launch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    port: u16,
    env_file_path: PathBuf,
    database_path: PathBuf,
    log_directory: PathBuf,
    extra_env: BTreeMap<String, String>,
}

impl LaunchConfig {
    pub fn new(
        port: u16,
        env_file_path: PathBuf,
        database_path: PathBuf,
        log_directory: PathBuf,
        extra_env: BTreeMap<String, String>,
    ) -> Self {
        Self {
            port,
            env_file_path,
            database_path,
            log_directory,
            extra_env,
        }
    }

    /// Standard layout under the app directory: `.env`, `data/stock_analysis.db`, `logs/`.
    pub fn for_app_dir(port: u16, app_dir: &Path, extra_env: BTreeMap<String, String>) -> Self {
        Self::new(
            port,
            app_dir.join(ENV_FILENAME),
            app_dir.join(DATA_DIR).join(DATABASE_FILENAME),
            app_dir.join(LOG_DIR),
            extra_env,
        )
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn env_file_path(&self) -> &Path {
        &self.env_file_path
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn log_directory(&self) -> &Path {
        &self.log_directory
    }

    pub fn extra_env(&self) -> &BTreeMap<String, String> {
        &self.extra_env
    }
}
