use crate::exception::ExceptionTrace;
use crate::level::Level;
use crate::logger::Logger;
use crate::record::ExtraData;
use std::error::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that writes every event through a [`Logger`],
/// so `tracing` macros produce the same JSON lines as the logger methods.
///
/// Event fields map onto the record like this:
/// - `message` becomes the message;
/// - a string field named `code` becomes the code;
/// - an error value (`error = &err as &dyn Error`) becomes the `exception` trace;
/// - everything else lands in `extra_data`.
pub struct JsonLogLayer {
    logger: Logger,
}

impl JsonLogLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl<S> Layer<S> for JsonLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        // Spans carry no output of their own here.
        !metadata.is_event() || self.logger.enabled(Level::from(*metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = Level::from(*event.metadata().level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let record = self.logger.record(
            level,
            visitor.message.unwrap_or_default(),
            visitor.code.as_deref(),
            Some(&visitor.extra),
            visitor.exception,
        );
        self.logger.emit(&record);
    }
}

/// Collects the fields of one event.
#[derive(Default)]
pub struct FieldVisitor {
    pub message: Option<String>,
    pub code: Option<String>,
    pub extra: ExtraData,
    pub exception: Option<ExceptionTrace>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "code" => self.code = Some(value.to_string()),
            name => {
                self.extra.insert(name, value);
            }
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.extra.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.extra.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.extra.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.extra.insert(field.name(), value);
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn Error + 'static)) {
        self.exception = Some(ExceptionTrace::from_error(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "code" => self.code = Some(format!("{:?}", value)),
            name => {
                self.extra.insert(name, format!("{:?}", value));
            }
        }
    }
}
