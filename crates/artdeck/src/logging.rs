//! Logging initialization.
//!
//! Logs go to stderr through `tracing-subscriber`, either human-readable or
//! as JSON lines. `RUST_LOG` overrides the level when set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber.
///
/// `verbose` selects DEBUG instead of INFO; `json_format` switches to JSON.
pub fn init(verbose: bool, json_format: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize from the `[logging]` section, with CLI flags taking precedence.
pub fn init_from_config(
    config: &artdeck_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let (verbose, json_format) = resolve(config, verbose_override, json_logs_override);
    init(verbose, json_format);
}

fn resolve(config: &artdeck_core::Config, verbose: bool, json_logs: bool) -> (bool, bool) {
    (
        verbose || matches!(config.logging.level.as_str(), "debug" | "trace"),
        json_logs || config.logging.format == "json",
    )
}
