//! Structured logging for the Tellus terrain engine.
//!
//! Span-based, filterable logging via the `tracing` ecosystem: console output
//! with uptime timestamps and module targets, filtered by `RUST_LOG` or the
//! configuration's `debug.log_level`.

use tellus_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// Filter precedence: the `RUST_LOG` environment variable, then the config's
/// `debug.log_level` when non-empty, then `info`. Safe to call more than once
/// (tests do); later calls leave the first subscriber in place.
pub fn init_logging(config: Option<&Config>) {
    let fallback = config
        .map(|c| c.debug.log_level.as_str())
        .filter(|level| !level.is_empty())
        .unwrap_or("info");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

/// The filter used when neither `RUST_LOG` nor the config overrides it.
#[must_use]
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new("info")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_enables_info() {
        let filter = default_env_filter();
        assert!(format!("{filter}").contains("info"));
    }

    #[test]
    fn test_filter_strings_parse() {
        for filter in ["info", "debug,tellus_lod=trace", "warn", "error"] {
            assert!(EnvFilter::try_new(filter).is_ok(), "failed to parse {filter}");
        }
    }

    #[test]
    fn test_config_level_is_used_as_fallback() {
        let mut config = Config::default();
        config.debug.log_level = "tellus_lod=debug".to_string();
        // Must not panic, and repeated initialization is tolerated.
        init_logging(Some(&config));
        init_logging(None);
    }
}
