//! Tracing initialization
//!
//! Installs a `tracing-subscriber` formatter for applications (recipe
//! runners, bench tools) built on this crate. `RUST_LOG` takes precedence;
//! otherwise the configured level applies to every target.
//!
//! ```bash
//! RUST_LOG=lab_commands=debug my_recipe_runner
//! ```

use crate::config::LabConfig;
use tracing_subscriber::EnvFilter;

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, ANSI-coloured lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Build the filter: `RUST_LOG` if set and valid, otherwise `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a global subscriber at `level`.
///
/// Returns `false` if a global subscriber was already installed; calling
/// this twice is harmless.
pub fn init(level: &str, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true);
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.is_ok()
}

/// Install a global subscriber at the configured application log level.
pub fn init_from_config(config: &LabConfig) -> bool {
    init(&config.application.log_level, LogFormat::Pretty)
}
