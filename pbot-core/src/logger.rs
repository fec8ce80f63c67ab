//! Tracing setup for pbot binaries: one fmt layer teed to stdout and an append-mode log file.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Env var holding the pbot-specific filter; wins over `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "PBOT_LOG";
const DEFAULT_FILTER: &str = "info";

/// Installs the global tracing subscriber.
///
/// Filter directives come from `PBOT_LOG`, then `RUST_LOG`, then `info`. Load `.env` before
/// calling this so both variables are visible. Fails when a subscriber is already installed.
pub fn init_tracing(log_file_path: &str) -> anyhow::Result<()> {
    let filter = log_filter(
        env::var(LOG_FILTER_ENV).ok().as_deref(),
        env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
    )?;
    let file = open_log_file(Path::new(log_file_path))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout.and(file))
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false);

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("tracing subscriber already installed")?;

    tracing::debug!(log_file = %log_file_path, "tracing initialized");
    Ok(())
}

/// Builds the filter from the first non-empty directive set.
fn log_filter(pbot_log: Option<&str>, rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
    let directives = [pbot_log, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|d| !d.is_empty())
        .unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter '{}'", directives))
}

fn open_log_file(path: &Path) -> anyhow::Result<Arc<File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    Ok(Arc::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_precedence() {
        let filter = log_filter(Some("pbot=trace"), Some("warn")).unwrap();
        assert_eq!(filter.to_string(), "pbot=trace");

        let filter = log_filter(Some("  "), Some("warn")).unwrap();
        assert_eq!(filter.to_string(), "warn");

        let filter = log_filter(None, None).unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_log_filter_rejects_bad_directives() {
        assert!(log_filter(Some("pbot=loud"), None).is_err());
    }

    #[test]
    fn test_open_log_file_creates_directory_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bot.log");

        open_log_file(&path).unwrap();
        fs::write(&path, "first\n").unwrap();
        {
            use std::io::Write;
            let file = open_log_file(&path).unwrap();
            (&*file).write_all(b"second\n").unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
