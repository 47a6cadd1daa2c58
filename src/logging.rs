//! Diagnostic logging for the binary.
//!
//! Library code only emits `tracing` events; the binary installs a stderr
//! subscriber once at startup. `FLUENTCOACH_LOG` takes the usual
//! `EnvFilter` syntax (`debug`, `fluentcoach=trace,reqwest=info`, ...).

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FLUENTCOACH_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

fn build_filter(directives: Option<&str>) -> EnvFilter {
    match directives.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => EnvFilter::try_new(value).unwrap_or_else(|err| {
            eprintln!("⚠️  Ignoring invalid {LOG_ENV} value '{value}': {err}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}

/// Install the global subscriber. Calling it again is harmless.
pub fn init() {
    let directives = std::env::var(LOG_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_value_uses_warn() {
        assert_eq!(build_filter(None).to_string(), "warn");
        assert_eq!(build_filter(Some("  ")).to_string(), "warn");
    }

    #[test]
    fn valid_directives_are_kept() {
        let filter = build_filter(Some("fluentcoach=debug"));
        assert_eq!(filter.to_string(), "fluentcoach=debug");
    }

    #[test]
    fn invalid_directives_fall_back_to_warn() {
        assert_eq!(build_filter(Some("fluentcoach=loudest")).to_string(), "warn");
    }
}
