//! Log output for the chat server.
//!
//! Every event goes to stdout. A copy is appended to `RAGCHAT_LOG_FILE`, or to
//! `logs/ragchat.log` when that variable is unset, through a background writer thread.
//! A file that cannot be opened only costs the file copy; stdout logging still starts.
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "RAGCHAT_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "logs/ragchat.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` filters events (default `info`).
///
/// Only the first call installs anything; later calls are no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact());

    let path = log_file_path(std::env::var(LOG_FILE_VAR).ok());
    let file_layer = file_writer(&path).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .compact()
    });

    if registry.with(file_layer).try_init().is_ok() {
        tracing::debug!(path = %path.display(), "Logging initialized");
    }
}

/// Where the file copy of the log goes; blank values fall back to the default path.
fn log_file_path(configured: Option<String>) -> PathBuf {
    configured
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from)
}

fn file_writer(path: &Path) -> Option<NonBlocking> {
    if LOG_GUARD.get().is_some() {
        return None;
    }
    match open_log_file(path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(writer)
        }
        Err(error) => {
            eprintln!("Failed to open log file {}: {error}", path.display());
            None
        }
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_falls_back_when_unset_or_blank() {
        assert_eq!(log_file_path(None), PathBuf::from("logs/ragchat.log"));
        assert_eq!(
            log_file_path(Some("   ".into())),
            PathBuf::from("logs/ragchat.log")
        );
        assert_eq!(
            log_file_path(Some(" /var/log/ragchat.log ".into())),
            PathBuf::from("/var/log/ragchat.log")
        );
    }
}
