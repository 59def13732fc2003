// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; with the `file-logging` feature, a combined log
//! file inside a timestamped run folder and retention of old runs.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Build the filter for the given flags over a default level
pub fn build_filter(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string(default_level);
    EnvFilter::try_new(&directives).with_context(|| format!("Invalid log filter '{}'", directives))
}

/// Initialize console logging
///
/// # Errors
///
/// Fails when the level is not a valid filter or a global subscriber is
/// already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<()> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(build_filter(debug_flags, default_level)?);

    Registry::default()
        .with(console_layer)
        .try_init()
        .context("Failed to install global tracing subscriber")
}

#[cfg(feature = "file-logging")]
pub use file::*;

#[cfg(feature = "file-logging")]
mod file {
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use chrono::{NaiveDateTime, Utc};
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_appender::rolling;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{Layer, Registry};

    use super::build_filter;
    use crate::cli::CrateDebugFlags;

    const RUN_PREFIX: &str = "run_";
    const RUN_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

    /// Keeps the file writer alive; logs are flushed on drop
    pub struct LoggingGuard {
        _file_guard: WorkerGuard,
        log_dir: PathBuf,
    }

    impl LoggingGuard {
        /// Run folder of this process
        pub fn log_dir(&self) -> &Path {
            &self.log_dir
        }
    }

    /// Initialize console logging plus a combined `dendrify.log`
    ///
    /// ```text
    /// ./logs/
    ///   └── run_20250101_120000/
    ///       └── dendrify.log
    /// ```
    ///
    /// # Arguments
    /// * `log_dir` - Base directory for logs (default: `./logs`)
    /// * `retention_days` - Keep runs for N days (default: 30)
    /// * `retention_runs` - Keep the N most recent runs (default: 10)
    pub fn init_file_logging(
        debug_flags: &CrateDebugFlags,
        default_level: &str,
        log_dir: Option<PathBuf>,
        retention_days: Option<u64>,
        retention_runs: Option<usize>,
    ) -> Result<LoggingGuard> {
        let base_log_dir = log_dir.unwrap_or_else(|| PathBuf::from("./logs"));
        let run_folder = base_log_dir.join(format!("{}{}", RUN_PREFIX, Utc::now().format(RUN_TIMESTAMP)));
        std::fs::create_dir_all(&run_folder)
            .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

        cleanup_old_runs(&base_log_dir, retention_days.unwrap_or(30), retention_runs.unwrap_or(10))?;

        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(build_filter(debug_flags, default_level)?);

        let (writer, guard) = tracing_appender::non_blocking(rolling::never(&run_folder, "dendrify.log"));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(build_filter(debug_flags, default_level)?);

        Registry::default()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .context("Failed to install global tracing subscriber")?;

        Ok(LoggingGuard {
            _file_guard: guard,
            log_dir: run_folder,
        })
    }

    /// Remove run folders older than `retention_days`, then all but the
    /// newest `retention_runs`. Returns the number of folders removed.
    pub(crate) fn cleanup_old_runs(base_log_dir: &Path, retention_days: u64, retention_runs: usize) -> Result<usize> {
        if !base_log_dir.exists() {
            return Ok(0);
        }
        let cutoff = Utc::now().naive_utc() - chrono::Duration::days(retention_days as i64);

        let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
        for entry in std::fs::read_dir(base_log_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let stamp = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(RUN_PREFIX))
                .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP).ok());
            if let Some(stamp) = stamp {
                runs.push((path, stamp));
            }
        }
        // newest first
        runs.sort_by(|a, b| b.1.cmp(&a.1));

        let mut removed = 0;
        for (index, (path, stamp)) in runs.iter().enumerate() {
            if index < retention_runs && *stamp >= cutoff {
                continue;
            }
            match std::fs::remove_dir_all(path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Warning: Failed to remove old log directory {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }

}
