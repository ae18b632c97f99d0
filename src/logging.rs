use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::error::ConnectuiError;

pub fn default_log_dir() -> Result<PathBuf, ConnectuiError> {
    Ok(dirs::cache_dir()
        .ok_or_else(|| ConnectuiError::Config("Could not find cache directory".to_string()))?
        .join("connectui"))
}

/// Send `log` records to `<dir>/connectui.log`. The terminal belongs to the
/// UI, so nothing is written to stderr. `RUST_LOG` overrides the level.
pub fn init_logging(dir: &Path) -> Result<PathBuf, ConnectuiError> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;
    let path = dir.join("connectui.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| ConnectuiError::Config(format!("Failed to install logger: {}", e)))?;

    Ok(path)
}
