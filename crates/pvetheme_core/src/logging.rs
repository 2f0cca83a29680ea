//! Logging setup
//!
//! Diagnostics go to stderr so stdout stays clean for reports and `--json`.
//! `PVETHEME_LOG` (EnvFilter syntax) overrides the configured level.

use is_terminal::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

pub const LOG_ENV_VAR: &str = "PVETHEME_LOG";

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub level: String,
    pub format: LogFormat,
    /// `None` means colour when stderr is a terminal
    pub ansi: Option<bool>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self::from(&LoggingConfig::default())
    }
}

impl From<&LoggingConfig> for LoggingOptions {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            format: config.format,
            ansi: None,
        }
    }
}

impl LoggingOptions {
    /// Level for `-v` counts and `-q`, falling back to the configured level.
    pub fn with_verbosity(mut self, verbose: u8, quiet: bool) -> Self {
        self.level = match (quiet, verbose) {
            (true, _) => "error".to_string(),
            (false, 0) => self.level,
            (false, 1) => "info".to_string(),
            (false, 2) => "debug".to_string(),
            (false, _) => "trace".to_string(),
        };
        self
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Returns `false` when one was already
/// installed (repeat calls and tests).
pub fn init_logging(options: &LoggingOptions) -> bool {
    let ansi = options
        .ansi
        .unwrap_or_else(|| std::io::stderr().is_terminal());
    let registry = tracing_subscriber::registry().with(build_filter(&options.level));

    let result = match options.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_ansi(false))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(ansi),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .without_time()
                    .with_writer(std::io::stderr)
                    .with_ansi(ansi),
            )
            .try_init(),
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_overrides_level() {
        let base = LoggingOptions::default();
        assert_eq!(base.clone().with_verbosity(0, false).level, "warn");
        assert_eq!(base.clone().with_verbosity(1, false).level, "info");
        assert_eq!(base.clone().with_verbosity(2, false).level, "debug");
        assert_eq!(base.clone().with_verbosity(5, false).level, "trace");
        assert_eq!(base.with_verbosity(3, true).level, "error");
    }

    #[test]
    fn second_init_is_harmless() {
        let options = LoggingOptions {
            ansi: Some(false),
            ..LoggingOptions::default()
        };
        let _ = init_logging(&options);
        assert!(!init_logging(&options));
    }
}
