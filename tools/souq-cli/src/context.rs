//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use souq_server::config::DEFAULT_CONFIG_FILE;
use souq_server::ServerConfig;

use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Explicit `--config`, or the nearest `souq.toml` above the working directory.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let config_path = match config_path {
            Some(path) => Some(resolve_path(&cwd, path)),
            None => find_config(&cwd),
        };
        Ok(Self {
            config_path,
            output,
            cwd,
        })
    }

    /// Resolved server configuration with environment overrides applied.
    pub fn config(&self) -> Result<ServerConfig> {
        if let Some(path) = &self.config_path {
            self.output.debug(&format!("Using config {}", path.display()));
        }
        ServerConfig::resolve(self.config_path.as_deref(), &self.cwd).context("Failed to load configuration")
    }
}

fn resolve_path(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Walk up from `start` looking for a config file.
fn find_config(start: &Path) -> Option<PathBuf> {
    let names = [DEFAULT_CONFIG_FILE, ".souq.toml"];
    let mut current = start.to_path_buf();
    loop {
        for name in &names {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}
