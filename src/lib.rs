pub mod env;
pub mod error;
pub mod exception;
pub mod format;
pub mod level;
pub mod record;
pub mod sink;
pub mod layer;
pub mod logger;

pub mod init;
pub mod noop_sink;

pub use error::LoggerError;
pub use exception::ExceptionTrace;
pub use init::{get_logger, init_logger, init_tracing, install_logger, try_get_logger, LoggerConfig};
pub use level::Level;
pub use logger::{Logger, LoggerBuilder, TraceSource};
pub use record::{ExtraData, LogRecord};
pub use sink::{LogSink, MemorySink, StdoutSink};
