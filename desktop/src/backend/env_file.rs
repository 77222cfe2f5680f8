//! First-run creation of the user-editable `.env` file.

use crate::backend::{SupervisorError, SupervisorResult};

use std::path::{Path, PathBuf};

use tracing::info;

pub const ENV_FILENAME: &str = ".env";
pub const ENV_TEMPLATE_FILENAME: &str = ".env.example";

const DEFAULT_ENV_CONTENT: &str = "# Configure your API keys and stock list here.\n";

/// Creates the backend's `.env` file when it is missing.
pub struct EnvBootstrapper {
    template: Option<PathBuf>,
}

impl EnvBootstrapper {
    pub fn new(template: Option<PathBuf>) -> Self {
        Self { template }
    }

    /// Ensure an env file exists at `path`.
    ///
    /// An existing file is left untouched. A missing one is copied from the
    /// template when the template exists, otherwise a one-line default is
    /// written. Parent directories are created as needed.
    pub fn ensure_env_file(&self, path: &Path) -> SupervisorResult<()> {
        if path.exists() {
            return Ok(());
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| SupervisorError::env_file(path.to_path_buf(), e))?;
        }

        match self.template.as_deref().filter(|t| t.is_file()) {
            Some(template) => {
                std::fs::copy(template, path)
                    .map_err(|e| SupervisorError::env_file(path.to_path_buf(), e))?;
                info!("Created {} from {}", path.display(), template.display());
            }
            None => {
                std::fs::write(path, DEFAULT_ENV_CONTENT)
                    .map_err(|e| SupervisorError::env_file(path.to_path_buf(), e))?;
                info!("Created default {}", path.display());
            }
        }

        Ok(())
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }
}
