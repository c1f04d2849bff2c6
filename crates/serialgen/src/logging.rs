//! Tracing subscriber setup
//!
//! Filtering comes from `SERIALGEN_LOG` when set, otherwise from the
//! verbosity flag. With `--log-file` events go through a non-blocking
//! appender; the returned guard must live until the process exits or
//! buffered lines are lost.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SERIALGEN_LOG";

pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber. Returns the appender guard when logging
/// to a file.
pub fn init(verbose: u8, log_file: Option<&Path>, json: bool) -> Option<WorkerGuard> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false);

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "serialgen.log".into());
            let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            let installed = if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            installed.ok().map(|_| guard)
        }
        None => {
            let builder = builder.with_writer(std::io::stderr);
            // Already installed (tests) is fine.
            let _ = if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            None
        }
    }
}
