//! Structured logging to stderr and a daily-rolled file under the app's
//! local data directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::APP_IDENTIFIER;

const LOG_FILE_NAME: &str = "chess-desktop.log";

/// Rotated log files older than this are deleted at startup.
const LOG_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub fn init_logging() -> WorkerGuard {
    let log_dir = log_directory();

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_thread_ids(true)
                .with_writer(file_writer),
        )
        .init();

    tracing::info!(
        "Chess Desktop {} logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );

    prune_rotated_logs(&log_dir);

    guard
}

fn log_directory() -> PathBuf {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_IDENTIFIER)
        .join("logs");

    if let Err(e) = fs::create_dir_all(&dir) {
        eprintln!("Warning: failed to create log directory: {e}");
    }

    dir
}

/// Delete date-suffixed files left behind by the daily roller once their
/// modification time ages past the retention window.
fn prune_rotated_logs(log_dir: &Path) {
    let cutoff = SystemTime::now() - LOG_RETENTION;

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Skipping log cleanup: {e}");
            return;
        }
    };

    let mut removed = 0usize;
    for entry in entries.flatten() {
        if !is_rotated_log(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let stale = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| modified < cutoff)
            .unwrap_or(false);

        if stale {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove {:?}: {e}", entry.path()),
            }
        }
    }

    if removed > 0 {
        tracing::info!("Pruned {removed} expired log files");
    }
}

/// The daily roller names its output `chess-desktop.log.YYYY-MM-DD`; only
/// those files are cleanup candidates.
fn is_rotated_log(name: &str) -> bool {
    name.strip_prefix(LOG_FILE_NAME)
        .is_some_and(|suffix| suffix.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_date_suffixed_files_are_cleanup_candidates() {
        assert!(is_rotated_log("chess-desktop.log.2026-08-20"));
        assert!(!is_rotated_log("chess-desktop.log"));
        assert!(!is_rotated_log("settings.json"));
        assert!(!is_rotated_log("chess-desktop.log2"));
    }
}
