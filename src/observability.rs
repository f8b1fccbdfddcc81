//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// How log output should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TracingConfig {
    /// One JSON object per line instead of human-readable text
    pub json_format: bool,
    /// 0 = info, 1 = debug, 2+ = trace (for this crate)
    pub verbosity: u8,
    /// Only warnings and errors
    pub quiet: bool,
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(config: &TracingConfig) -> String {
    if config.quiet {
        return "warn".to_string();
    }
    match config.verbosity {
        0 => "info".to_string(),
        1 => "info,dubflow=debug".to_string(),
        _ => "debug,dubflow=trace".to_string(),
    }
}

/// Initialize the tracing subscriber with structured logging.
///
/// Logs go to stderr so stdout stays free for run reports.
pub fn init_tracing(config: TracingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config)));

    let initialized = if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if initialized.is_err() {
        // A global subscriber is already installed (tests, embedding apps)
        return;
    }
    tracing::debug!(json_format = config.json_format, "tracing initialized");
}
