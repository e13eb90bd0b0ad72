//! Tracing setup for the server binary.
//!
//! Development runs get pretty terminal output with span timings. Production
//! runs (`BINSCAN_ENV=production`) write JSON to a daily file under the log
//! directory and plain compact lines to stdout for the service manager.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the default filter when `RUST_LOG` is unset.
pub const LOG_LEVEL_ENV: &str = "BINSCAN_LOG_LEVEL";

/// Environment variable overriding the production log directory.
pub const LOG_DIR_ENV: &str = "BINSCAN_LOG_DIR";

/// Environment variable selecting the [`LogMode`].
pub const MODE_ENV: &str = "BINSCAN_ENV";

const LOG_FILE_PREFIX: &str = "binscan";

/// Where and how log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Pretty stdout only.
    Development,
    /// JSON file plus compact stdout.
    Production,
}

impl LogMode {
    /// Read the mode from [`MODE_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(std::env::var(MODE_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Keeps the non-blocking writers running. Buffered lines are flushed when
/// it drops, so `main` holds it until exit.
#[must_use = "log lines are lost once the guard is dropped"]
#[derive(Debug)]
pub struct LogGuard {
    _writers: Vec<WorkerGuard>,
}

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG`, then [`LOG_LEVEL_ENV`], then `info`.
///
/// # Errors
///
/// Returns an error if the filter does not parse, the log directory cannot
/// be created, or a subscriber is already installed.
pub fn init(mode: LogMode) -> anyhow::Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(level)
    })?;
    let registry = tracing_subscriber::registry().with(filter);

    match mode {
        LogMode::Development => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
                )
                .try_init()?;
            Ok(LogGuard { _writers: Vec::new() })
        }
        LogMode::Production => {
            let dir = log_directory(std::env::var_os(LOG_DIR_ENV).map(PathBuf::from));
            let (file_writer, file_guard) = tracing_appender::non_blocking(daily_file(&dir)?);
            let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(file_writer)
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(fmt::layer().compact().with_writer(stdout_writer).with_ansi(false))
                .try_init()?;

            tracing::info!(dir = %dir.display(), "Writing logs to file");
            Ok(LogGuard {
                _writers: vec![file_guard, stdout_guard],
            })
        }
    }
}

fn daily_file(dir: &Path) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .with_context(|| format!("Cannot open log file in {}", dir.display()))
}

/// Production log directory: the override if given, else a platform path.
fn log_directory(override_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir;
    }
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/binscan")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "binscan")
            .map_or_else(|| PathBuf::from("./logs"), |dirs| dirs.data_dir().join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(LogMode::parse(Some("production")), LogMode::Production);
        assert_eq!(LogMode::parse(Some(" PRODUCTION ")), LogMode::Production);
        assert_eq!(LogMode::parse(Some("staging")), LogMode::Development);
        assert_eq!(LogMode::parse(None), LogMode::Development);
    }

    #[test]
    fn test_log_directory_override_wins() {
        let dir = log_directory(Some(PathBuf::from("/tmp/binscan-logs")));
        assert_eq!(dir, PathBuf::from("/tmp/binscan-logs"));

        let default = log_directory(None);
        assert!(default.ends_with("binscan") || default.ends_with("logs"));
    }

    #[test]
    fn test_daily_file_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("logs");
        daily_file(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
