// In-process store: tables as JSON rows, live change feeds, injectable failures

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use huddle_types::ChangeEvent;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::feed::{ChangeFeed, FeedSpec};
use crate::query::{Filter, Query};
use crate::trait_client::{ObjectStorage, RemoteStore};

const FEED_BUFFER: usize = 256;

/// Stored-function handler; receives the store so it can read and write tables
pub type RpcHandler = Arc<dyn Fn(&MemoryStore, Value) -> Result<Value> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Select,
    Insert,
    Update,
    Delete,
    Rpc,
    Subscribe,
    Upload,
}

/// One recorded call against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub target: String,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Value>>,
    unique_keys: HashMap<String, Vec<String>>,
    timestamp_columns: HashMap<String, Vec<String>>,
    rpcs: HashMap<String, RpcHandler>,
    failures: HashMap<String, u16>,
    operations: Vec<Operation>,
    subscribers: Vec<(FeedSpec, mpsc::Sender<ChangeEvent>)>,
    objects: HashMap<String, (Vec<u8>, String)>,
    last_timestamp: Option<DateTime<Utc>>,
}

/// [`RemoteStore`] kept entirely in memory.
///
/// Inserted rows get an `id` and a `created_at` when absent (timestamps are
/// strictly increasing), unique keys raise [`StoreError::Conflict`], and every
/// write is pushed to matching change feeds.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.unique_keys.insert(
            "channel_members".to_string(),
            vec!["channel_id".to_string(), "user_id".to_string()],
        );
        inner.unique_keys.insert(
            "ai_chat_participants".to_string(),
            vec!["chat_id".to_string(), "user_id".to_string()],
        );
        inner.timestamp_columns.insert(
            "ai_chats".to_string(),
            vec!["created_at".to_string(), "updated_at".to_string()],
        );
        inner.timestamp_columns.insert(
            "channel_members".to_string(),
            vec!["joined_at".to_string()],
        );
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Declare columns that must be unique together in `table`
    pub fn with_unique_key(self, table: &str, columns: &[&str]) -> Self {
        self.lock().unique_keys.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn register_rpc<F>(&self, function: &str, handler: F)
    where
        F: Fn(&MemoryStore, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.lock().rpcs.insert(function.to_string(), Arc::new(handler));
    }

    /// Make every call on a table (or stored function) fail with an HTTP-like status
    pub fn fail_on(&self, target: &str, status: u16) {
        self.lock().failures.insert(target.to_string(), status);
    }

    pub fn clear_failure(&self, target: &str) {
        self.lock().failures.remove(target);
    }

    /// Rows currently stored in `table`
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Seed rows without recording operations or notifying feeds
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut inner = self.lock();
        let prepared: Vec<Value> = rows
            .into_iter()
            .map(|row| prepare_row(&mut inner, table, row))
            .collect();
        inner.tables.entry(table.to_string()).or_default().extend(prepared);
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    pub fn count(&self, kind: OpKind, target: &str) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| op.kind == kind && op.target == target)
            .count()
    }

    /// Feeds whose consumer is still attached
    pub fn active_feed_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|(_, tx)| !tx.is_closed());
        inner.subscribers.len()
    }

    /// Push an event to matching feeds as if another client had written it
    pub fn emit(&self, event: ChangeEvent) {
        let mut inner = self.lock();
        publish(&mut inner, event);
    }

    pub fn object(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.lock().objects.get(path).cloned()
    }

    /// Insert bypassing failure injection; used by stored-function handlers
    pub fn insert_row(&self, table: &str, row: Value) -> Result<Value> {
        let mut inner = self.lock();
        if !row.is_object() {
            return Err(StoreError::Api {
                status: 400,
                code: None,
                message: format!("Row for {} must be a JSON object", table),
            });
        }
        let row = prepare_row(&mut inner, table, row);

        if let Some(columns) = inner.unique_keys.get(table) {
            let existing = inner.tables.get(table).map(Vec::as_slice).unwrap_or_default();
            let duplicate = existing
                .iter()
                .any(|other| columns.iter().all(|c| other.get(c) == row.get(c)));
            if duplicate {
                return Err(StoreError::Conflict(format!(
                    "duplicate key value violates unique constraint on {}({})",
                    table,
                    columns.join(", ")
                )));
            }
        }

        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        publish(&mut inner, ChangeEvent::insert(table, row.clone()));
        Ok(row)
    }

    fn record(&self, kind: OpKind, target: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.operations.push(Operation {
            kind,
            target: target.to_string(),
        });
        match inner.failures.get(target) {
            Some(status) => Err(StoreError::from_response(
                *status,
                &json!({ "message": format!("injected failure on {}", target) }).to_string(),
            )),
            None => Ok(()),
        }
    }
}

fn next_timestamp(inner: &mut Inner) -> String {
    let now = Utc::now().trunc_subsecs(6);
    let stamp = match inner.last_timestamp {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    };
    inner.last_timestamp = Some(stamp);
    stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn prepare_row(inner: &mut Inner, table: &str, row: Value) -> Value {
    let mut object = match row {
        Value::Object(map) => map,
        other => return other,
    };
    if !object.contains_key("id") {
        object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    let columns = inner
        .timestamp_columns
        .get(table)
        .cloned()
        .unwrap_or_else(|| vec!["created_at".to_string()]);
    for column in columns {
        if object.get(&column).map_or(true, Value::is_null) {
            let stamp = next_timestamp(inner);
            object.insert(column, Value::String(stamp));
        }
    }
    Value::Object(object)
}

fn publish(inner: &mut Inner, event: ChangeEvent) {
    inner.subscribers.retain(|(spec, tx)| {
        if tx.is_closed() {
            return false;
        }
        if spec.matches(&event) {
            if let Err(e) = tx.try_send(event.clone()) {
                tracing::warn!("Dropping change event for {}: {}", spec.table, e);
            }
        }
        true
    });
}

fn merge(target: &mut Value, patch: &Map<String, Value>) {
    if let Value::Object(object) = target {
        for (key, value) in patch {
            object.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, table: &str, query: Query) -> Result<Vec<Value>> {
        self.record(OpKind::Select, table)?;
        Ok(query.apply(self.rows(table)))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        self.record(OpKind::Insert, table)?;
        self.insert_row(table, row)
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
        self.record(OpKind::Update, table)?;
        let patch = match patch {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::Api {
                    status: 400,
                    code: None,
                    message: "Patch must be a JSON object".to_string(),
                })
            }
        };

        let mut inner = self.lock();
        let mut events = Vec::new();
        let mut updated = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            for row in rows.iter_mut() {
                if filters.iter().all(|f| f.matches(row)) {
                    let old = row.clone();
                    merge(row, &patch);
                    updated.push(row.clone());
                    events.push(ChangeEvent::update(table, row.clone(), Some(old)));
                }
            }
        }
        for event in events {
            publish(&mut inner, event);
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        self.record(OpKind::Delete, table)?;
        let mut inner = self.lock();
        let mut removed = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            let (gone, kept): (Vec<Value>, Vec<Value>) = rows
                .drain(..)
                .partition(|row| filters.iter().all(|f| f.matches(row)));
            *rows = kept;
            removed = gone;
        }
        for row in &removed {
            publish(&mut inner, ChangeEvent::delete(table, row.clone()));
        }
        Ok(removed)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        self.record(OpKind::Rpc, function)?;
        let handler = self.lock().rpcs.get(function).cloned();
        match handler {
            Some(handler) => handler(self, args),
            None => Err(StoreError::FunctionNotFound(format!(
                "Could not find the function public.{}",
                function
            ))),
        }
    }

    async fn subscribe(&self, spec: FeedSpec) -> Result<ChangeFeed> {
        self.record(OpKind::Subscribe, &spec.table)?;
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        self.lock().subscribers.push((spec.clone(), tx));
        Ok(ChangeFeed::new(spec, rx))
    }
}

#[async_trait]
impl ObjectStorage for MemoryStore {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.record(OpKind::Upload, bucket)?;
        let mut inner = self.lock();
        let key = format!("{}/{}", bucket, path);
        if inner.objects.contains_key(&key) {
            return Err(StoreError::Conflict(format!("The resource already exists: {}", key)));
        }
        inner.objects.insert(key, (bytes, content_type.to_string()));
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path)
    }
}
