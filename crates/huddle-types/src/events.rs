use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of row-level change delivered by a realtime feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row-level change pushed by the remote store.
///
/// Feeds deliver at-least-once, so the same insert can arrive twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_record: Option<Value>,
}

impl ChangeEvent {
    pub fn insert(table: impl Into<String>, record: Value) -> Self {
        Self {
            kind: ChangeKind::Insert,
            schema: "public".to_string(),
            table: table.into(),
            record: Some(record),
            old_record: None,
        }
    }

    pub fn update(table: impl Into<String>, record: Value, old_record: Option<Value>) -> Self {
        Self {
            kind: ChangeKind::Update,
            schema: "public".to_string(),
            table: table.into(),
            record: Some(record),
            old_record,
        }
    }

    pub fn delete(table: impl Into<String>, old_record: Value) -> Self {
        Self {
            kind: ChangeKind::Delete,
            schema: "public".to_string(),
            table: table.into(),
            record: None,
            old_record: Some(old_record),
        }
    }

    /// Decode the new row image, if the event carries one
    pub fn record_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.record
            .as_ref()
            .and_then(|r| serde_json::from_value(r.clone()).ok())
    }

    /// Read a string column from the old row image (deletes usually only carry keys)
    pub fn old_str(&self, column: &str) -> Option<&str> {
        self.old_record.as_ref()?.get(column)?.as_str()
    }

    /// Read a string column from the new row image
    pub fn new_str(&self, column: &str) -> Option<&str> {
        self.record.as_ref()?.get(column)?.as_str()
    }
}
