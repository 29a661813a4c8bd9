use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key used when caller context could not be turned into a JSON object.
pub const UNSERIALIZABLE_KEY: &str = "_unserializable";

/// Code written when the caller does not supply one.
pub const DEFAULT_CODE: &str = "-";

/// Caller-supplied context merged into a record under `extra_data`.
///
/// Values are [`serde_json::Value`]s, so anything stored here is JSON by
/// construction and the formatter never has to reject it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtraData(BTreeMap<String, Value>);

impl ExtraData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Convert any serializable value into extra data.
    ///
    /// A value that fails to serialize, or that is not a JSON object, is
    /// replaced by a placeholder map so the log call still goes through.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            Ok(other) => Self::placeholder(format!("expected a JSON object, got {}", kind(&other))),
            Err(e) => Self::placeholder(e.to_string()),
        }
    }

    pub(crate) fn placeholder(reason: impl Into<String>) -> Self {
        Self::new().with(UNSERIALIZABLE_KEY, reason.into())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl From<BTreeMap<String, Value>> for ExtraData {
    fn from(map: BTreeMap<String, Value>) -> Self {
        ExtraData(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ExtraData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ExtraData(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for ExtraData {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

/// One log event, built per call and serialized straight away.
///
/// Field declaration order is the output order. Optional fields are
/// omitted from the JSON object rather than written as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub level: Level,
    pub code: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<ExtraData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<Vec<String>>,
}

impl LogRecord {
    /// Record stamped with the current time, the default code and no
    /// optional fields.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self::at(Utc::now(), level, message)
    }

    pub fn at(timestamp: DateTime<Utc>, level: Level, message: impl Into<String>) -> Self {
        LogRecord {
            level,
            code: DEFAULT_CODE.to_string(),
            timestamp,
            message: message.into(),
            extra_data: None,
            trace_id: None,
            exception: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Attach extra data; an empty map leaves the field absent.
    pub fn with_extra(mut self, extra: ExtraData) -> Self {
        self.extra_data = Some(extra).filter(|e| !e.is_empty());
        self
    }

    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }

    pub fn with_exception(mut self, lines: Vec<String>) -> Self {
        self.exception = Some(lines);
        self
    }
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(crate::format::TIMESTAMP_FORMAT))
}
