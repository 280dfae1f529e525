//! Usage: Process-wide tracing setup (stderr + daily rolling file) and log retention.

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "travel_companion_lib=info,travel_companion=info";
const LOG_FILE_PREFIX: &str = "travel-companion";
const LOG_FILE_SUFFIX: &str = "log";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Installs the global subscriber. Keep the returned guard alive until exit so the file writer flushes.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let appender = std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("failed to create log dir {}: {e}", log_dir.display()))
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix(LOG_FILE_SUFFIX)
                .build(log_dir)
                .map_err(|e| format!("failed to open log file: {e}"))
        });

    let (file_layer, guard, file_err) = match appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard), None)
        }
        Err(err) => (None, None, Some(err)),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
    if installed.is_err() {
        // Someone else (tests, embedding host) already owns the global subscriber.
        return guard;
    }

    match file_err {
        Some(err) => tracing::warn!("file logging disabled: {}", err),
        None => tracing::info!(log_dir = %log_dir.display(), "logging initialized"),
    }

    guard
}

/// Runs once settings are known, so retention follows `log_retention_days`.
pub fn apply_retention(log_dir: &Path, retention_days: u32) {
    let removed = prune_old_logs(log_dir, retention_days, SystemTime::now());
    if removed > 0 {
        tracing::info!(retention_days, removed, "old log files removed");
    }
}

fn is_log_file_name(name: &str) -> bool {
    name.starts_with(&format!("{LOG_FILE_PREFIX}."))
        && name.ends_with(&format!(".{LOG_FILE_SUFFIX}"))
}

/// Best-effort: deletes rotated log files last modified more than `retention_days` before `now`.
pub(crate) fn prune_old_logs(log_dir: &Path, retention_days: u32, now: SystemTime) -> usize {
    let retention = Duration::from_secs(u64::from(retention_days.max(1)) * SECONDS_PER_DAY);
    let Some(cutoff) = now.checked_sub(retention) else {
        return 0;
    };

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!("log retention skipped: {}", err);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_log_file_name(name) {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified >= cutoff {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => tracing::warn!(file = name, "failed to remove old log file: {}", err),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::fs::test_support::unique_tmp_dir;

    #[test]
    fn log_file_name_matching() {
        assert!(is_log_file_name("travel-companion.2026-10-01.log"));
        assert!(!is_log_file_name("travel-companion.2026-10-01.txt"));
        assert!(!is_log_file_name("settings.json"));
        assert!(!is_log_file_name("other.2026-10-01.log"));
    }

    #[test]
    fn prune_removes_only_expired_log_files() {
        let dir = unique_tmp_dir("logs");
        std::fs::write(dir.join("travel-companion.2026-01-01.log"), "old").expect("write");
        std::fs::write(dir.join("notes.txt"), "keep").expect("write");

        // Fresh files: nothing is old enough yet.
        assert_eq!(prune_old_logs(&dir, 7, SystemTime::now()), 0);

        let later = SystemTime::now() + Duration::from_secs(8 * SECONDS_PER_DAY);
        assert_eq!(prune_old_logs(&dir, 7, later), 1);
        assert!(!dir.join("travel-companion.2026-01-01.log").exists());
        assert!(dir.join("notes.txt").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn prune_tolerates_missing_dir() {
        let dir = unique_tmp_dir("logs").join("missing");
        assert_eq!(prune_old_logs(&dir, 7, SystemTime::now()), 0);
    }
}
