//! Logging initialization for the `canvas-merge` binary.
//!
//! Events go to stderr so that stdout stays free for documents and reports.
//! The filter comes from `CANVAS_MERGE_LOG` (an `EnvFilter` directive such as
//! `debug` or `canvas_merge_core::resolve=trace`) and defaults to `warn`.
//!
//! - [`LogFormat::Text`] → human-readable lines
//! - [`LogFormat::Json`] → one JSON object per event, with span close events

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "CANVAS_MERGE_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Output format for log events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Filter from `CANVAS_MERGE_LOG`, or `warn` when unset or unparsable.
#[must_use]
pub fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber. Call once, early in `main()`.
pub fn init(format: LogFormat) {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let registry = tracing_subscriber::registry().with(filter());
    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .init(),
    }
}
