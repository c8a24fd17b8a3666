// ── Logging setup ──
//
// Level names follow the gateway's historical settings values
// (`information`, `warning`, ...). `RUST_LOG`, when set, wins over the
// configured level.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::{ConfigError, LogSettings};

/// Minimum severity written to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    /// Blank means `info`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "info" | "information" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "fatal" => Ok(Self::Error),
            "debug" => Ok(Self::Debug),
            "trace" | "verbose" => Ok(Self::Trace),
            other => Err(ConfigError::Validation {
                field: "log.level".into(),
                reason: format!("unknown log level '{other}'"),
            }),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Install the global `tracing` subscriber.
///
/// Fails if the level is unknown or a subscriber is already installed.
pub fn init_tracing(settings: &LogSettings) -> Result<(), ConfigError> {
    let level: LogLevel = settings.level.parse()?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ConfigError::Logging(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_historical_level_names() {
        for (raw, expected) in [
            ("", LogLevel::Info),
            ("info", LogLevel::Info),
            ("information", LogLevel::Info),
            ("warning", LogLevel::Warn),
            ("error", LogLevel::Error),
            ("debug", LogLevel::Debug),
        ] {
            assert_eq!(raw.parse::<LogLevel>().unwrap(), expected, "{raw:?}");
        }
    }

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!("  Warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("VERBOSE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
    }

    #[test]
    fn unknown_level_is_a_validation_error() {
        let err = "chatty".parse::<LogLevel>().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "log.level"));
    }

    #[test]
    fn maps_onto_tracing_levels() {
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
        assert!(LogLevel::Debug < LogLevel::Error);
    }
}
