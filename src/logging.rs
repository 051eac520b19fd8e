use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Env var holding the `EnvFilter` directive, e.g. `debug` or `driveup=trace`.
pub const LOG_LEVEL_ENV: &str = "DRIVEUP_LOG_LEVEL";

/// Install the global subscriber: timestamped lines on stderr and, if
/// `log_file` is set, the same lines appended to that file without colors.
///
/// A log file that cannot be opened is reported and skipped.
pub fn init_logging(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Cannot open log file {}: {e}", path.display());
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init();
}
