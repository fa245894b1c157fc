//! Logging initialization: stdout is reserved for the transcript.
//!
//! Reads `RUST_LOG` (filter) and `LOG_FILE` (path) from env (e.g. via .env).
//! When `LOG_FILE` is set, logs are appended to that file; otherwise they go to stderr.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Default filter when `RUST_LOG` is unset; quiets the HTTP stack.
const DEFAULT_FILTER: &str = "info,hyper_util=off,reqwest=warn";

/// Installs the global subscriber.
///
/// - **RUST_LOG**: e.g. `info`, `debug`, `threadline=debug`. Default: `info`.
/// - **LOG_FILE**: when set, logs are appended to this file (plain text, no ANSI).
pub fn init() -> std::io::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    match std::env::var("LOG_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_filter(filter);
            let _ = tracing_subscriber::registry().with(file_layer).try_init();
            tracing::info!(path = %path, "threadline logging to file");
        }
        _ => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter);
            let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
        }
    }
    Ok(())
}
