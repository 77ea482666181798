//! Telemetry boundary.
//!
//! A finalized call becomes one [`CallRecord`]: an ordered list of named
//! string/bool attributes handed to a [`TelemetrySink`]. Attribute names are
//! owned by configuration, never hard-coded here.

pub mod attributes;

use std::sync::Mutex;

use serde::{Serialize, Serializer};

pub use attributes::build_record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub call_id: u64,
    pub method: String,
    pub path: String,
    pub outcome: &'static str,
    #[serde(serialize_with = "attributes_as_map")]
    pub attributes: Vec<(String, AttributeValue)>,
}

fn attributes_as_map<S: Serializer>(attrs: &[(String, AttributeValue)], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(attrs.iter().map(|(k, v)| (k, v)))
}

impl CallRecord {
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(AttributeValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(AttributeValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Receives one record per finalized call.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, record: &CallRecord);
}

/// Writes records as structured `tracing` events.
#[derive(Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, record: &CallRecord) {
        match serde_json::to_string(record) {
            Ok(json) => tracing::info!(
                target: "tracewall::telemetry",
                call_id = record.call_id,
                outcome = record.outcome,
                record = %json,
                "call finalized"
            ),
            Err(e) => tracing::warn!(
                target: "tracewall::telemetry",
                call_id = record.call_id,
                error = %e,
                "call record not serializable"
            ),
        }
    }
}

/// Keeps records in memory. Used by tests and embedders that poll.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<CallRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CallRecord> {
        match self.records.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, record: &CallRecord) {
        match self.records.lock() {
            Ok(mut g) => g.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
    }
}
