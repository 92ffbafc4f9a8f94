use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::schema::LoggingConfig;

const LOG_FILE_PREFIX: &str = "think-space.log";
const LOG_RETENTION_DAYS: u64 = 7;

/// Initialize the logging system
///
/// `RUST_LOG` and `LOG_FORMAT` take precedence over the configured level and
/// format. The returned guard must be held for the life of the process so the
/// file writer flushes.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());

    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level_str));

    for (module, level) in &config.overrides {
        if let Ok(directive) = format!("{}={}", module, level).parse() {
            filter = filter.add_directive(directive);
        } else {
            eprintln!("Invalid log directive: {}={}", module, level);
        }
    }

    let format_str = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    let is_json = format_str.eq_ignore_ascii_case("json");

    // rolling::daily(dir, "think-space.log") produces think-space.log.YYYY-MM-DD
    let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = if is_json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let file_layer = if is_json {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Err(e) = cleanup_old_logs(Path::new(&config.dir), LOG_RETENTION_DAYS, SystemTime::now()) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    guard
}

/// Remove log files last modified more than `days` days before `now`.
/// Returns the number of files removed.
fn cleanup_old_logs(dir: &Path, days: u64, now: SystemTime) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let threshold = Duration::from_secs(days * 24 * 3600);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if matches!(age, Some(age) if age > threshold) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                // Logger is still initializing, so report on stderr.
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert_eq!(cleanup_old_logs(&missing, 7, SystemTime::now()).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_removes_only_stale_log_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("think-space.log.2020-01-01"), "old").unwrap();
        std::fs::write(temp_dir.path().join("other.txt"), "keep").unwrap();

        // Pretend it is 30 days in the future.
        let later = SystemTime::now() + Duration::from_secs(30 * 24 * 3600);
        let removed = cleanup_old_logs(temp_dir.path(), 7, later).unwrap();

        assert_eq!(removed, 1);
        assert!(temp_dir.path().join("other.txt").exists());
        assert!(!temp_dir.path().join("think-space.log.2020-01-01").exists());
    }

    #[test]
    fn test_cleanup_keeps_fresh_log_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("think-space.log.today"), "new").unwrap();

        let removed = cleanup_old_logs(temp_dir.path(), 7, SystemTime::now()).unwrap();
        assert_eq!(removed, 0);
    }
}
