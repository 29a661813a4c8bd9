/// Environment variable names read by this crate when building the
/// process-wide logger.
///
/// These are purely helpers; [`crate::logger::Logger`] itself can be built
/// without touching the environment.

/// Minimum level to emit (`DEBUG`, `INFO`, `WARNING`/`WARN`, `ERROR`).
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Optional logger name; defaults to `lambda`.
pub const LOG_NAME_ENV: &str = "LOG_NAME";

/// Trace header set by the Lambda runtime for each invocation, e.g.
/// `Root=1-64193bc5-14fda5f13f1ccef9177e2502;Parent=a9094f386f8990fc;Sampled=1`.
pub const TRACE_ID_ENV: &str = "_X_AMZN_TRACE_ID";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and blank values alike.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
