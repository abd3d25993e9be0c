//! Logging initialization for purlsight-daemon.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `PurlsightConfig`. Every API call runs inside a `request` span carrying
//! `request_id` and `operation`; the JSON format attaches those fields to each
//! event and emits one event when the span closes, with its busy/idle time.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use purlsight_core::config::GeneralConfig;

/// Targets capped at `warn` unless `RUST_LOG` says otherwise.
/// sqlx logs every statement at `info`.
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "h2=warn"];

/// Filter directives for a configured level.
pub fn filter_directives(level: &str) -> String {
    let mut directives = vec![level.to_owned()];
    directives.extend(QUIET_TARGETS.iter().map(|t| (*t).to_owned()));
    directives.join(",")
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level` when set.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(&config.log_level)))
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {e}", config.log_level))?;

    match config.log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize JSON logging: {e}")),
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize pretty logging: {e}")),
        other => Err(anyhow::anyhow!(
            "unknown log format '{other}', expected 'json' or 'pretty'"
        )),
    }
}
