use crate::env::{env_non_empty, env_or, LOG_LEVEL_ENV, LOG_NAME_ENV, TRACE_ID_ENV};
use crate::error::LoggerError;
use crate::layer::JsonLogLayer;
use crate::level::Level;
use crate::logger::{report, Logger, TraceSource, DEFAULT_NAME};
use crate::sink::LogSink;
use std::io;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Settings for the process-wide logger.
///
/// **Fields**
/// - `name`: logger name, used when reporting the logger's own failures.
///   Must not be empty.
/// - `level`: minimum level written; lower levels are dropped.
/// - `trace_env`: environment variable holding the per-invocation trace
///   header, read on every call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggerConfig {
    pub name: String,
    pub level: Level,
    pub trace_env: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            level: Level::Debug,
            trace_env: TRACE_ID_ENV.to_string(),
        }
    }
}

impl LoggerConfig {
    /// Read `LOG_LEVEL` (default `DEBUG`) and `LOG_NAME` (default `lambda`).
    ///
    /// An unknown level is an error rather than a silent default.
    pub fn from_env() -> Result<Self, LoggerError> {
        Ok(Self {
            name: env_non_empty(LOG_NAME_ENV).unwrap_or_else(|| DEFAULT_NAME.to_string()),
            level: env_or(LOG_LEVEL_ENV, Level::Debug.as_str()).parse()?,
            trace_env: TRACE_ID_ENV.to_string(),
        })
    }

    /// Build a logger writing to standard output.
    pub fn build(&self) -> Result<Logger, LoggerError> {
        self.builder().build()
    }

    /// Build a logger writing to `sink`.
    pub fn build_with_sink(&self, sink: Arc<dyn LogSink>) -> Result<Logger, LoggerError> {
        self.builder().sink(sink).build()
    }

    fn builder(&self) -> crate::logger::LoggerBuilder {
        Logger::builder(self.name.as_str())
            .level(self.level)
            .trace_source(TraceSource::Env(self.trace_env.clone()))
    }
}

/// Level used when `LOG_LEVEL` can't be parsed. Only errors get through,
/// so a rejected setting never makes the output louder.
pub const FALLBACK_LEVEL: Level = Level::Error;

/// Build a logger from `config` and install it as the process-wide instance.
///
/// **Returns**
/// - the installed logger on the first successful call;
/// - the configuration error if `config` is invalid;
/// - [`LoggerError::AlreadyInitialized`] if an instance already exists,
///   whether from an earlier call or from [`get_logger`].
pub fn init_logger(config: LoggerConfig) -> Result<&'static Logger, LoggerError> {
    install_logger(config.build()?)
}

/// Install an already built `logger`, e.g. one writing to a custom sink.
/// Same outcomes as [`init_logger`].
pub fn install_logger(logger: Logger) -> Result<&'static Logger, LoggerError> {
    let mut installed = false;
    let global = LOGGER.get_or_init(|| {
        installed = true;
        logger
    });
    if installed {
        Ok(global)
    } else {
        Err(LoggerError::AlreadyInitialized)
    }
}

/// Process-wide logger, built from the environment on first use.
///
/// Concurrent first calls all observe the same instance; configuration
/// runs exactly once. An invalid environment is reported on stderr and
/// yields a logger at [`FALLBACK_LEVEL`]. Use [`try_get_logger`] to get
/// the rejection instead.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| logger_from_env(io::stderr().lock()))
}

/// Like [`get_logger`], but an invalid environment is returned as an error
/// and nothing is installed.
pub fn try_get_logger() -> Result<&'static Logger, LoggerError> {
    if let Some(logger) = LOGGER.get() {
        return Ok(logger);
    }
    let logger = LoggerConfig::from_env()?.build()?;
    // A racing caller may have installed first; theirs is kept.
    Ok(LOGGER.get_or_init(|| logger))
}

fn logger_from_env<W: io::Write>(diagnostics: W) -> Logger {
    LoggerConfig::from_env()
        .and_then(|config| config.build())
        .unwrap_or_else(|e| {
            report(diagnostics, DEFAULT_NAME, "invalid logger configuration, only errors are logged", &e);
            Logger::default().with_level(FALLBACK_LEVEL)
        })
}

/// Install a global `tracing` subscriber that writes every event through
/// `logger`.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`JsonLogLayer`] as the global
/// default subscriber, so `tracing::info!` and friends produce the same
/// JSON lines as the [`Logger`] methods. Fails if another global
/// subscriber is already set.
pub fn init_tracing(logger: Logger) -> Result<(), LoggerError> {
    let subscriber = Registry::default().with(JsonLogLayer::new(logger));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_debug_with_lambda_trace_header() {
        let config = LoggerConfig::default();
        assert_eq!(config.name, "lambda");
        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.trace_env, "_X_AMZN_TRACE_ID");
    }

    #[test]
    fn config_builds_logger_with_its_level() {
        let config = LoggerConfig {
            level: Level::Warning,
            ..LoggerConfig::default()
        };
        let logger = config.build_with_sink(Arc::new(crate::noop_sink::NoopSink)).unwrap();
        assert_eq!(logger.name(), "lambda");
        assert!(!logger.enabled(Level::Info));
        assert!(logger.enabled(Level::Error));
    }

    // Only test touching LOG_LEVEL in this binary.
    #[test]
    fn invalid_level_in_environment_does_not_lower_threshold() {
        std::env::set_var(LOG_LEVEL_ENV, "LOUDEST");
        let mut diagnostics = Vec::new();
        let logger = logger_from_env(&mut diagnostics);
        let from_env = LoggerConfig::from_env();

        std::env::set_var(LOG_LEVEL_ENV, "critical");
        let critical = LoggerConfig::from_env();
        std::env::remove_var(LOG_LEVEL_ENV);

        assert_eq!(logger.level(), Level::Error);
        assert!(!logger.enabled(Level::Debug));
        assert!(String::from_utf8(diagnostics).unwrap().contains("LOUDEST"));
        assert!(matches!(from_env, Err(LoggerError::InvalidLevel(ref s)) if s == "LOUDEST"));
        assert_eq!(critical.unwrap().level, Level::Error);
    }

    #[test]
    fn config_with_empty_name_is_rejected() {
        let config = LoggerConfig {
            name: String::new(),
            ..LoggerConfig::default()
        };
        assert!(matches!(config.build(), Err(LoggerError::EmptyName)));
    }
}
