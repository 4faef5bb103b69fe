//! Tracing setup for hosts embedding the caching engine.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging options.
///
/// The default is quiet human-readable output at `info`. A `RUST_LOG`
/// environment filter, when present, wins over everything configured
/// here.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Lower the default level to `debug` and annotate source locations.
    pub verbose: bool,
    /// Explicit filter directives, e.g. `"vowkit_sw=trace,reqwest=warn"`.
    pub directives: Option<String>,
}

impl LogOptions {
    /// The filter directives to fall back on when `RUST_LOG` is unset.
    fn fallback_directives(&self) -> &str {
        match self.directives.as_deref() {
            Some(directives) => directives,
            None if self.verbose => "debug",
            None => "info",
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.fallback_directives()))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global tracing subscriber.
pub fn init_tracing(options: &LogOptions) {
    let registry = tracing_subscriber::registry().with(options.filter());

    if options.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(options.verbose)
                    .with_line_number(options.verbose),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_quiet_text() {
        let options = LogOptions::default();
        assert!(!options.json);
        assert!(!options.verbose);
        assert_eq!(options.fallback_directives(), "info");
    }

    #[test]
    fn test_verbose_lowers_default_level() {
        let options = LogOptions {
            verbose: true,
            ..Default::default()
        };
        assert_eq!(options.fallback_directives(), "debug");
    }

    #[test]
    fn test_explicit_directives_win() {
        let options = LogOptions {
            verbose: true,
            directives: Some("vowkit_sw=trace,reqwest=warn".to_string()),
            ..Default::default()
        };
        assert_eq!(options.fallback_directives(), "vowkit_sw=trace,reqwest=warn");
    }
}
