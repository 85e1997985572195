//! Tracing initialization.

use crate::error::ClientResult;
use crate::properties::LogProperties;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// File name of the client log inside the per-user log directory.
const LOG_FILE_NAME: &str = "client.log";

/// Returns the log file path inside `dir`.
pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(LOG_FILE_NAME)
}

/// Prepares the per-user log directory, honoring the flush setting.
pub fn prepare_log_dir(dir: &Path, flush_previous: bool) -> ClientResult<()> {
    if flush_previous && dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Initializes tracing once for the process.
///
/// `--verbose` forces debug; otherwise the properties' level applies,
/// overridable through `RUST_LOG`. When file logging is enabled, output
/// goes to an append-mode plain-text file under the per-user directory
/// and the console stays free for the menu.
pub fn init(verbose: bool, log_dir: &Path, properties: &LogProperties) -> ClientResult<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(properties.level.clone()))
    };

    if properties.file_enabled {
        prepare_log_dir(log_dir, properties.flush_previous)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path(log_dir))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Arc::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}
