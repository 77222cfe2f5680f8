//! Application directory layout.

use crate::backend::env_file::ENV_TEMPLATE_FILENAME;

use std::path::{Path, PathBuf};

const APP_NAME: &str = "dsa-desktop";
const RESOURCES_DIR: &str = "resources";

/// Locations the supervisor reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Writable per-installation state (`.env`, `data/`, `logs/`, `desktop.toml`)
    pub app_dir: PathBuf,
    /// Read-only packaged resources (`backend/`, `.env.example`)
    pub resources_dir: PathBuf,
    /// Source checkout used in development mode
    pub project_root: PathBuf,
    /// Running from an installed distribution
    pub packaged: bool,
}

impl AppPaths {
    /// Detect the layout from the running executable.
    ///
    /// A `resources/` directory next to the executable marks a packaged
    /// install; state then lives beside the executable. Otherwise this is a
    /// development run: state goes to the per-user data directory and the
    /// project root is the current directory.
    pub fn detect() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let exe_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let resources_dir = exe_dir.join(RESOURCES_DIR);
        let project_root = std::env::current_dir()?;

        if resources_dir.is_dir() {
            return Ok(Self::packaged(exe_dir, resources_dir));
        }

        let app_dir = dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| project_root.join(format!(".{APP_NAME}")));

        Ok(Self::development(app_dir, project_root))
    }

    pub fn packaged(app_dir: PathBuf, resources_dir: PathBuf) -> Self {
        Self {
            project_root: app_dir.clone(),
            app_dir,
            resources_dir,
            packaged: true,
        }
    }

    pub fn development(app_dir: PathBuf, project_root: PathBuf) -> Self {
        Self {
            app_dir,
            resources_dir: project_root.clone(),
            project_root,
            packaged: false,
        }
    }

    /// Template the `.env` file is seeded from on first run.
    pub fn env_template(&self) -> PathBuf {
        if self.packaged {
            self.resources_dir.join(ENV_TEMPLATE_FILENAME)
        } else {
            self.project_root.join(ENV_TEMPLATE_FILENAME)
        }
    }
}
