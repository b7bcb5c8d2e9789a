//! Subscriber setup for binaries embedding the engine.
//!
//! The library itself only emits `tracing` events; a binary picks where they
//! go. Default target is `~/.local/state/kdown/kdown.log`, with stderr as the
//! fallback when the state dir cannot be written.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,kdown=debug,kdown_core=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Path of the default log file under the XDG state home.
pub fn default_log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("kdown")?;
    Ok(xdg_dirs.get_state_home().join("kdown.log"))
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Log to the default file. Returns Err if the file cannot be opened or a
/// global subscriber is already installed, so the caller can fall back.
pub fn init_logging() -> Result<PathBuf> {
    let path = default_log_path()?;
    init_logging_at(&path)?;
    Ok(path)
}

/// Log to an explicit file (appending).
pub fn init_logging_at(path: &Path) -> Result<()> {
    let file = open_append(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {}", e))?;
    tracing::info!("kdown logging initialized at {}", path.display());
    Ok(())
}

/// Log to stderr only. Silently keeps an already-installed subscriber.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
