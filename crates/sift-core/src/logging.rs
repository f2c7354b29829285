//! Diagnostic logging to stderr.
//!
//! stdout carries records and reports, so logs always go to stderr. The
//! filter comes from `SIFT_LOG` when set, otherwise from the verbosity flags,
//! otherwise from the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV_VAR: &str = "SIFT_LOG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// `-v` count.
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
    /// Level from configuration, used when nothing else is set.
    pub config_level: Option<String>,
}

impl LogSettings {
    /// Filter directive, ignoring the environment.
    pub fn directive(&self) -> String {
        if self.quiet {
            return "error".to_string();
        }
        match self.verbose {
            0 => self
                .config_level
                .clone()
                .unwrap_or_else(|| "info".to_string()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_new(self.directive()))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber. Calling it twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init(settings: &LogSettings) {
    let registry = tracing_subscriber::registry().with(settings.filter());
    let result = if settings.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_precedence() {
        let mut settings = LogSettings {
            config_level: Some("warn".into()),
            ..LogSettings::default()
        };
        assert_eq!(settings.directive(), "warn");
        settings.verbose = 1;
        assert_eq!(settings.directive(), "debug");
        settings.verbose = 3;
        assert_eq!(settings.directive(), "trace");
        settings.quiet = true;
        assert_eq!(settings.directive(), "error");
    }

    #[test]
    fn test_default_is_info() {
        assert_eq!(LogSettings::default().directive(), "info");
    }
}
