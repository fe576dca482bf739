//! Logging and tracing initialization.
//!
//! Logs go to stderr so that the CLI's operator output on stdout stays
//! readable when piped. `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Targets that log protocol chatter at `info`/`warn` during normal runs.
const NOISY_TARGETS: &[&str] = &["chromiumoxide=error", "tungstenite=error"];

/// Build the filter for `level`, keeping the browser protocol crates quiet.
pub fn filter_directives(level: &str) -> String {
    let level = if level.trim().is_empty() { "info" } else { level.trim() };
    std::iter::once(level)
        .chain(NOISY_TARGETS.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the given configuration.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(
            builder
                .with_target(config.level.contains("debug") || config.level.contains("trace"))
                .finish(),
        )
    };
    // A second init (tests, embedding) keeps the first subscriber.
    installed.ok();
}
