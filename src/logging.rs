//! Tracing subscriber setup
//!
//! Two layers share one `EnvFilter`: compact console output on stderr and a
//! timestamped, ANSI-free copy appended to `<workdir>/triquetra.log`.
//! `RUST_LOG` overrides the default level.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default level for the given `-v` count
pub fn level_for(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber.
///
/// Without a log path, or when the log file cannot be opened, only the
/// console layer is installed. Later calls are ignored.
pub fn init(level: Level, log_path: Option<&Path>) {
    let console = fmt::layer()
        .with_target(false)
        .without_time()
        .compact()
        .with_writer(std::io::stderr);

    let file = log_path.and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    match file {
        Some(file) => {
            tracing_subscriber::registry()
                .with(env_filter(level))
                .with(console)
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .ok();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter(level))
                .with(console)
                .try_init()
                .ok();
        }
    }
}
