use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// One captured log event
#[derive(Debug, Clone, Serialize)]
pub struct EventData {
    pub level: String,
    pub target: String,
    /// The event's `message` field, empty if it had none
    pub message: String,
    pub fields: HashMap<String, serde_json::Value>,
    // nanoseconds since the unix epoch
    pub timestamp: u128,
}

impl EventData {
    /// Look up a structured field as a string, numbers included.
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Shared storage for captured events
#[derive(Debug, Clone, Default)]
pub struct CapturedEvents {
    events: Arc<RwLock<Vec<EventData>>>,
}

impl CapturedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: EventData) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }

    /// Snapshot of everything captured so far, oldest first.
    pub fn events(&self) -> Vec<EventData> {
        self.events.read().map(|events| events.clone()).unwrap_or_default()
    }

    /// Captured events at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<EventData> {
        let level = level.to_string();
        self.events().into_iter().filter(|e| e.level == level).collect()
    }

    /// Captured events whose message contains `needle`.
    pub fn with_message(&self, needle: &str) -> Vec<EventData> {
        self.events().into_iter().filter(|e| e.message.contains(needle)).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

/// A tracing layer that records events in memory.
///
/// Used by tests to assert on what was logged, e.g. that a dropped chunk
/// produced a warning.
pub struct CaptureLayer {
    storage: CapturedEvents,
}

impl CaptureLayer {
    pub fn new(storage: CapturedEvents) -> Self {
        Self { storage }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;

        let message = match fields.remove("message") {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        let metadata = event.metadata();
        self.storage.push(EventData {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
            timestamp,
        });
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
