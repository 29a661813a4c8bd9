/// Errors reported while configuring a logger.
///
/// Nothing on the logging path itself returns these: once a
/// [`crate::logger::Logger`] exists, every call is fail-open.
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("logger name can not be empty")]
    EmptyName,

    #[error("unknown log level: {0:?}")]
    InvalidLevel(String),

    #[error("process-wide logger is already initialized")]
    AlreadyInitialized,

    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
