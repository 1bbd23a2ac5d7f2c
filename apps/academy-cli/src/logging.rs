use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingSection};

/// Filter directive for a `-v` count; `None` leaves the choice to config.
fn verbosity_directive(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

/// `RUST_LOG`, then `-v`, then `logging.level`, then `warn`.
fn build_filter(verbose: u8, config: &LoggingSection) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = verbosity_directive(verbose)
        .or(config.level.as_deref())
        .unwrap_or("warn");
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("invalid log level '{directive}': {e}; using warn");
        EnvFilter::new("warn")
    })
}

/// Install the global subscriber. Output goes to stderr so command output on
/// stdout stays machine-readable.
pub fn init(verbose: u8, config: &LoggingSection) {
    let filter = build_filter(verbose, config);
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(UtcTime::rfc_3339()),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_timer(UtcTime::rfc_3339()),
            )
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }
}
