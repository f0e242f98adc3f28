//! Process-wide `tracing` subscriber setup for embedders and tests.

use std::env;
use std::fmt;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

/// Environment variable selecting [`LogFormat`].
pub const LOG_FORMAT_ENV: &str = "STRAND_LOG_FORMAT";
/// Environment variable selecting [`LogLevel`].
pub const LOG_LEVEL_ENV: &str = "STRAND_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    pub const DEFAULT: Self = Self {
        format: LogFormat::Auto,
        level: LogLevel::Info,
    };

    /// Defaults overridden by `STRAND_LOG_FORMAT` / `STRAND_LOG_LEVEL`. Unparseable values are
    /// ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let format = env::var(LOG_FORMAT_ENV).ok();
        let level = env::var(LOG_LEVEL_ENV).ok();
        Self::DEFAULT.with_specs(format.as_deref(), level.as_deref())
    }

    #[must_use]
    fn with_specs(mut self, format: Option<&str>, level: Option<&str>) -> Self {
        if let Some(format) = format.and_then(LogFormat::parse) {
            self.format = format;
        }
        if let Some(level) = level.and_then(LogLevel::parse) {
            self.level = level;
        }
        self
    }

    #[must_use]
    pub fn resolved(self) -> Self {
        let format = match self.format {
            LogFormat::Auto => LogFormat::Text,
            other => other,
        };
        Self { format, ..self }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Installs a global `fmt` subscriber writing to stderr. Only the first call in a process has
/// any effect; `RUST_LOG` directives take precedence over `options.level`.
pub fn init_logging(options: &LogOptions) {
    use std::io::IsTerminal;
    use std::sync::OnceLock;
    use tracing_subscriber::{fmt, EnvFilter};

    static INSTALLED: OnceLock<()> = OnceLock::new();

    let options = options.resolved();
    INSTALLED.get_or_init(|| {
        let ansi = env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(options.level.to_string()));
        let builder = fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .with_target(true);
        let installed = match options.format {
            LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
            LogFormat::Auto | LogFormat::Text => {
                tracing::subscriber::set_global_default(builder.compact().finish())
            }
        };
        if installed.is_err() {
            tracing::debug!(target: "strand", "a global subscriber was already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_and_levels() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("plain"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
        assert_eq!(LogLevel::parse("Warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn specs_override_defaults_and_bad_values_are_ignored() {
        let opts = LogOptions::DEFAULT.with_specs(Some("json"), Some("nonsense"));
        assert_eq!(opts.format, LogFormat::Json);
        assert_eq!(opts.level, LogLevel::Info);
    }

    #[test]
    fn auto_resolves_to_text() {
        assert_eq!(LogOptions::default().resolved().format, LogFormat::Text);
        let json = LogOptions {
            format: LogFormat::Json,
            level: LogLevel::Debug,
        };
        assert_eq!(json.resolved(), json);
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(&LogOptions::DEFAULT);
        init_logging(&LogOptions {
            format: LogFormat::Json,
            level: LogLevel::Trace,
        });
    }
}
