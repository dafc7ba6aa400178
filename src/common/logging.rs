//! Logging and tracing configuration
//!
//! Console output for test results is printed directly; tracing carries the
//! diagnostic stream (requests, logins, persistence) to stderr and,
//! optionally, to a log file.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("apiflow=debug,warn")
        } else {
            EnvFilter::new("apiflow=info,warn")
        }
    })
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies.
///
/// When `log_file` is given, a second layer writes full-detail logs to that
/// file through a non-blocking writer. The returned guard must be held
/// until exit so buffered lines are flushed.
pub fn init_cli(verbose: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(default_filter(verbose))
            .with(stderr_layer)
            .init();
        return None;
    };

    let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
    let dir = dir.unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "apiflow.log".into());

    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
    }

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Some(guard)
}
