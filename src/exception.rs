use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;

/// Rendered trace of an error value, one entry per physical line.
///
/// Lines run from the root cause to the outermost error, so the last line
/// always describes the error the caller actually handled. Building a trace
/// only borrows the error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionTrace {
    lines: Vec<String>,
}

impl ExceptionTrace {
    pub fn from_error(err: &(dyn Error + '_)) -> Self {
        let mut trace = ExceptionTrace::default();
        trace.push_chain(err);
        trace
    }

    /// Like [`ExceptionTrace::from_error`], preceded by the frames of
    /// `backtrace` when it was actually captured (`RUST_BACKTRACE` set).
    pub fn with_backtrace(err: &(dyn Error + '_), backtrace: &Backtrace) -> Self {
        let mut trace = ExceptionTrace::default();
        if backtrace.status() == BacktraceStatus::Captured {
            trace.lines.push("stack backtrace:".to_string());
            trace.push_text(&backtrace.to_string());
        }
        trace.push_chain(err);
        trace
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn push_chain(&mut self, err: &(dyn Error + '_)) {
        let mut chain = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        for (i, message) in chain.iter().rev().enumerate() {
            let prefix = if i == 0 { "error: " } else { "which caused: " };
            let mut physical = message.lines();
            let head = physical.next().unwrap_or_default();
            self.lines.push(format!("{prefix}{head}"));
            self.lines.extend(physical.map(str::to_string));
        }
    }

    fn push_text(&mut self, text: &str) {
        self.lines.extend(text.lines().filter(|l| !l.trim().is_empty()).map(str::to_string));
    }
}

impl<E: Error> From<&E> for ExceptionTrace {
    fn from(err: &E) -> Self {
        ExceptionTrace::from_error(err)
    }
}
