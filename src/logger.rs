use crate::env::TRACE_ID_ENV;
use crate::error::LoggerError;
use crate::exception::ExceptionTrace;
use crate::format::{format_record, parse_trace_id};
use crate::level::Level;
use crate::record::{ExtraData, LogRecord, DEFAULT_CODE};
use crate::sink::{LogSink, StdoutSink};
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Name used when none is configured.
pub const DEFAULT_NAME: &str = "lambda";

/// Where a logger gets the trace header for each line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSource {
    /// Read the named environment variable on every call.
    Env(String),
    /// Use a fixed header, typically one invocation's.
    Fixed(Option<String>),
    /// Never emit `trace_id`.
    Disabled,
}

impl TraceSource {
    /// Current trace id, already reduced to its `Root=` value.
    pub fn resolve(&self) -> Option<String> {
        match self {
            TraceSource::Env(var) => std::env::var(var).ok().and_then(|h| parse_trace_id(&h)),
            TraceSource::Fixed(header) => header.as_deref().and_then(parse_trace_id),
            TraceSource::Disabled => None,
        }
    }
}

impl Default for TraceSource {
    fn default() -> Self {
        TraceSource::Env(TRACE_ID_ENV.to_string())
    }
}

/// Structured JSON logger.
///
/// Every call that passes the level check produces exactly one JSON line
/// on the configured [`LogSink`]. Cloning is cheap; clones share the sink.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    level: Level,
    sink: Arc<dyn LogSink>,
    trace: TraceSource,
    static_fields: Arc<ExtraData>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("trace", &self.trace)
            .field("static_fields", &self.static_fields)
            .finish_non_exhaustive()
    }
}

impl Default for Logger {
    /// Logger named `lambda` writing every level to standard output.
    fn default() -> Self {
        Logger {
            name: Arc::from(DEFAULT_NAME),
            level: Level::Debug,
            sink: Arc::new(StdoutSink),
            trace: TraceSource::default(),
            static_fields: Arc::new(ExtraData::new()),
        }
    }
}

impl Logger {
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Clone of this logger with a different threshold.
    pub fn with_level(&self, level: Level) -> Logger {
        Logger {
            level,
            ..self.clone()
        }
    }

    /// Clone of this logger pinned to one invocation's trace header.
    pub fn for_invocation(&self, trace_header: Option<&str>) -> Logger {
        Logger {
            trace: TraceSource::Fixed(trace_header.map(str::to_string)),
            ..self.clone()
        }
    }

    pub fn debug(&self, message: impl Into<String>, code: Option<&str>, extra: Option<&ExtraData>) {
        self.log(Level::Debug, message, code, extra, None);
    }

    pub fn info(&self, message: impl Into<String>, code: Option<&str>, extra: Option<&ExtraData>) {
        self.log(Level::Info, message, code, extra, None);
    }

    pub fn warning(&self, message: impl Into<String>, code: &str, extra: Option<&ExtraData>) {
        self.log(Level::Warning, message, Some(code), extra, None);
    }

    /// Warning that carries the trace of `error`, if one is given.
    pub fn warning_with_trace(
        &self,
        message: impl Into<String>,
        code: &str,
        extra: Option<&ExtraData>,
        error: Option<&dyn Error>,
    ) {
        self.log(Level::Warning, message, Some(code), extra, error);
    }

    /// Error line. `exception` is only written when `error` is `Some`.
    pub fn error(
        &self,
        message: impl Into<String>,
        code: &str,
        extra: Option<&ExtraData>,
        error: Option<&dyn Error>,
    ) {
        self.log(Level::Error, message, Some(code), extra, error);
    }

    pub fn log(
        &self,
        level: Level,
        message: impl Into<String>,
        code: Option<&str>,
        extra: Option<&ExtraData>,
        error: Option<&dyn Error>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let trace = error.map(ExceptionTrace::from_error);
        let record = self.record(level, message.into(), code, extra, trace);
        self.emit(&record);
    }

    /// Level-checked line carrying a prebuilt trace, such as one from
    /// [`ExceptionTrace::with_backtrace`].
    pub fn log_trace(
        &self,
        level: Level,
        message: impl Into<String>,
        code: Option<&str>,
        extra: Option<&ExtraData>,
        trace: ExceptionTrace,
    ) {
        if !self.enabled(level) {
            return;
        }
        let record = self.record(level, message.into(), code, extra, Some(trace));
        self.emit(&record);
    }

    /// Build a record the way the level methods do, with ambient context
    /// applied. Useful with an [`ExceptionTrace`] that carries a backtrace.
    pub fn record(
        &self,
        level: Level,
        message: String,
        code: Option<&str>,
        extra: Option<&ExtraData>,
        exception: Option<ExceptionTrace>,
    ) -> LogRecord {
        let mut record = LogRecord::new(level, message)
            .with_code(code.unwrap_or(DEFAULT_CODE))
            .with_extra(self.merge_extra(extra))
            .with_trace_id(self.trace.resolve());
        if let Some(trace) = exception {
            record = record.with_exception(trace.into_lines());
        }
        record
    }

    /// Format and write a record as is.
    ///
    /// No level check happens here: callers building records by hand check
    /// [`Logger::enabled`] first, as [`Logger::log`] and [`Logger::log_trace`]
    /// do. Write failures are reported on stderr and otherwise swallowed.
    pub fn emit(&self, record: &LogRecord) {
        let line = format_record(record);
        if let Err(e) = self.sink.write_line(&line) {
            report(io::stderr().lock(), &self.name, "failed to write log line", &e);
        }
    }

    pub fn flush(&self) {
        if let Err(e) = self.sink.flush() {
            report(io::stderr().lock(), &self.name, "failed to flush log sink", &e);
        }
    }

    fn merge_extra(&self, extra: Option<&ExtraData>) -> ExtraData {
        let mut merged = (*self.static_fields).clone();
        if let Some(extra) = extra {
            merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }
}

/// Report one of the logger's own failures. A failure to write the report
/// is dropped as well.
pub(crate) fn report<W: Write>(mut out: W, name: &str, what: &str, err: &dyn fmt::Display) {
    let _ = writeln!(out, "{}: {}: {}", name, what, err);
}

/// Builder for [`Logger`].
pub struct LoggerBuilder {
    name: String,
    level: Level,
    sink: Option<Arc<dyn LogSink>>,
    trace: TraceSource,
    static_fields: ExtraData,
}

impl LoggerBuilder {
    fn new(name: impl Into<String>) -> Self {
        LoggerBuilder {
            name: name.into(),
            level: Level::Debug,
            sink: None,
            trace: TraceSource::default(),
            static_fields: ExtraData::new(),
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Output destination; standard output when not set.
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn trace_source(mut self, trace: TraceSource) -> Self {
        self.trace = trace;
        self
    }

    /// Field added to the `extra_data` of every line, such as an instance
    /// or container id. Call-site extra data wins on key collisions.
    pub fn static_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.static_fields.insert(key, value);
        self
    }

    pub fn build(self) -> Result<Logger, LoggerError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LoggerError::EmptyName);
        }
        Ok(Logger {
            name: Arc::from(name),
            level: self.level,
            sink: self.sink.unwrap_or_else(|| Arc::new(StdoutSink)),
            trace: self.trace,
            static_fields: Arc::new(self.static_fields),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use serde_json::json;
    use std::io;

    const HEADER: &str = "Root=1-64193bc5-14fda5f13f1ccef9177e2502;Parent=a9094f386f8990fc;Sampled=1";

    fn logger(level: Level) -> (Logger, MemorySink) {
        let sink = MemorySink::new();
        let logger = Logger::builder("test")
            .level(level)
            .sink(Arc::new(sink.clone()))
            .trace_source(TraceSource::Disabled)
            .build()
            .unwrap();
        (logger, sink)
    }

    #[derive(Debug)]
    struct InvalidValues;

    impl fmt::Display for InvalidValues {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("Invalid values.")
        }
    }

    impl Error for InvalidValues {}

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(Logger::builder("").build(), Err(LoggerError::EmptyName)));
        assert!(matches!(Logger::builder("   ").build(), Err(LoggerError::EmptyName)));
    }

    #[test]
    fn defaults_code_and_omits_extra() {
        let (logger, sink) = logger(Level::Debug);
        logger.debug("Debug logging.", None, None);
        logger.info("Info logging.", None, None);

        let records = sink.records();
        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r["code"], "-");
            assert!(r.get("extra_data").is_none());
            assert!(r.get("trace_id").is_none());
            assert!(r.get("exception").is_none());
        }
        assert_eq!(records[0]["level"], "DEBUG");
        assert_eq!(records[1]["level"], "INFO");
    }

    #[test]
    fn extra_round_trips() {
        let (logger, sink) = logger(Level::Debug);
        let extra = ExtraData::new().with("a", "abc").with("b", "def").with("c", 123);
        logger.info("Info logging.", Some("I0001"), Some(&extra));

        let r = &sink.records()[0];
        assert_eq!(r["code"], "I0001");
        assert_eq!(r["extra_data"], json!({"a": "abc", "b": "def", "c": 123}));
    }

    #[test]
    fn below_threshold_is_dropped() {
        let (logger, sink) = logger(Level::Warning);
        logger.debug("hidden", None, None);
        logger.info("hidden", None, None);
        logger.warning("shown", "W0001", None);
        logger.error("shown", "E0001", None, None);
        assert_eq!(sink.lines().len(), 2);
        assert!(!logger.enabled(Level::Info));
    }

    #[test]
    fn error_without_error_value_has_no_exception() {
        let (logger, sink) = logger(Level::Debug);
        logger.error("Error logging.", "E0001", None, None);
        assert!(sink.records()[0].get("exception").is_none());
    }

    #[test]
    fn error_with_error_value_has_trace() {
        let (logger, sink) = logger(Level::Debug);
        let err = InvalidValues;
        logger.error("Error logging.", "E0002", None, Some(&err));

        let r = &sink.records()[0];
        let lines = r["exception"].as_array().unwrap();
        assert!(lines.last().unwrap().as_str().unwrap().contains("Invalid values."));
    }

    #[test]
    fn warning_with_trace_attaches_exception() {
        let (logger, sink) = logger(Level::Debug);
        let err = InvalidValues;
        logger.warning_with_trace("Warning logging.", "W0002", None, Some(&err));
        logger.warning("Warning logging.", "W0001", None);

        let records = sink.records();
        assert_eq!(records[0]["level"], "WARNING");
        assert!(records[0].get("exception").is_some());
        assert!(records[1].get("exception").is_none());
    }

    #[test]
    fn invocation_clone_pins_trace_id() {
        let (logger, sink) = logger(Level::Debug);
        logger.for_invocation(Some(HEADER)).info("with trace", None, None);
        logger.for_invocation(None).info("without trace", None, None);
        logger.info("disabled", None, None);

        let records = sink.records();
        assert_eq!(records[0]["trace_id"], "1-64193bc5-14fda5f13f1ccef9177e2502");
        assert!(records[1].get("trace_id").is_none());
        assert!(records[2].get("trace_id").is_none());
    }

    #[test]
    fn env_trace_source_reads_variable_per_call() {
        let var = "LAMBDA_JSON_LOGGER_TEST_TRACE";
        let source = TraceSource::Env(var.to_string());
        std::env::remove_var(var);
        assert_eq!(source.resolve(), None);
        std::env::set_var(var, HEADER);
        assert_eq!(source.resolve().as_deref(), Some("1-64193bc5-14fda5f13f1ccef9177e2502"));
        std::env::remove_var(var);
    }

    #[test]
    fn static_fields_merge_with_call_site_winning() {
        let sink = MemorySink::new();
        let logger = Logger::builder("meta")
            .sink(Arc::new(sink.clone()))
            .trace_source(TraceSource::Disabled)
            .static_field("instance_id", "i-xxxxx")
            .static_field("container_id", "aabbccdd")
            .build()
            .unwrap();

        logger.info("plain", None, None);
        logger.info("override", None, Some(&ExtraData::new().with("container_id", "other")));

        let records = sink.records();
        assert_eq!(records[0]["extra_data"], json!({"instance_id": "i-xxxxx", "container_id": "aabbccdd"}));
        assert_eq!(records[1]["extra_data"]["container_id"], "other");
    }

    struct FailingSink;

    impl LogSink for FailingSink {
        fn write_line(&self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stderr closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stderr closed"))
        }
    }

    #[test]
    fn report_swallows_writer_failures() {
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed");
        report(BrokenWriter, "test", "failed to write log line", &err);
    }

    #[test]
    fn report_names_logger_and_failure() {
        let mut out = Vec::new();
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed");
        report(&mut out, "test", "failed to write log line", &err);
        assert_eq!(String::from_utf8(out).unwrap(), "test: failed to write log line: stdout closed\n");
    }

    #[test]
    fn log_trace_respects_threshold() {
        let (logger, sink) = logger(Level::Error);
        let err = InvalidValues;
        let bt = std::backtrace::Backtrace::disabled();
        logger.log_trace(Level::Warning, "hidden", Some("W0003"), None, ExceptionTrace::with_backtrace(&err, &bt));
        logger.log_trace(Level::Error, "shown", Some("E0003"), None, ExceptionTrace::with_backtrace(&err, &bt));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["code"], "E0003");
        assert_eq!(records[0]["exception"], json!(["error: Invalid values."]));
    }

    #[test]
    fn with_level_changes_only_threshold() {
        let (logger, sink) = logger(Level::Debug);
        let quiet = logger.with_level(Level::Error);
        quiet.info("hidden", None, None);
        logger.info("shown", None, None);
        assert_eq!(quiet.name(), "test");
        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn write_failures_do_not_reach_caller() {
        let logger = Logger::builder("failing")
            .sink(Arc::new(FailingSink))
            .build()
            .unwrap();
        logger.error("still fine", "E9999", None, None);
        logger.flush();
    }
}
