use std::time::Duration;

use futures::Stream;
use huddle_types::{ChangeEvent, ChangeKind};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::query::{scalar_text, Filter};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Which row events a feed delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedEvent {
    Insert,
    Update,
    Delete,
    #[default]
    All,
}

impl FeedEvent {
    /// Wire name used in realtime join payloads
    pub fn as_str(self) -> &'static str {
        match self {
            FeedEvent::Insert => "INSERT",
            FeedEvent::Update => "UPDATE",
            FeedEvent::Delete => "DELETE",
            FeedEvent::All => "*",
        }
    }

    pub fn accepts(self, kind: ChangeKind) -> bool {
        matches!(
            (self, kind),
            (FeedEvent::All, _)
                | (FeedEvent::Insert, ChangeKind::Insert)
                | (FeedEvent::Update, ChangeKind::Update)
                | (FeedEvent::Delete, ChangeKind::Delete)
        )
    }
}

/// Subscription key: (schema, table, optional row filter)
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSpec {
    pub schema: String,
    pub table: String,
    pub event: FeedEvent,
    pub filter: Option<Filter>,
}

impl FeedSpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: "public".to_string(),
            table: table.into(),
            event: FeedEvent::All,
            filter: None,
        }
    }

    pub fn on(mut self, event: FeedEvent) -> Self {
        self.event = event;
        self
    }

    pub fn filter_eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter = Some(Filter::eq(column, value));
        self
    }

    /// Channel topic name used by the realtime server
    pub fn topic(&self) -> String {
        match self.filter_expr() {
            Some(expr) => format!("realtime:{}:{}:{}", self.schema, self.table, expr),
            None => format!("realtime:{}:{}", self.schema, self.table),
        }
    }

    /// Row filter as the realtime server expects it, e.g. `channel_id=eq.42`
    pub fn filter_expr(&self) -> Option<String> {
        self.filter
            .as_ref()
            .map(|f| format!("{}={}", f.column(), f.operand()))
    }

    /// Whether an event belongs to this feed.
    ///
    /// Delete events usually carry only the primary key, so a filter column
    /// missing from the old row image does not exclude the event.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.schema != self.schema || event.table != self.table || !self.event.accepts(event.kind) {
            return false;
        }
        let filter = match &self.filter {
            Some(f) => f,
            None => return true,
        };
        match event.kind {
            ChangeKind::Delete => match event.old_record.as_ref() {
                Some(old) if old.get(filter.column()).is_some() => filter.matches(old),
                _ => true,
            },
            _ => event.record.as_ref().is_some_and(|r| filter.matches(r)),
        }
    }
}

/// Live change feed. Closing (or dropping) it stops delivery.
pub struct ChangeFeed {
    spec: FeedSpec,
    receiver: mpsc::Receiver<ChangeEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChangeFeed {
    /// Feed fed directly by a sender held elsewhere (in-process stores)
    pub fn new(spec: FeedSpec, receiver: mpsc::Receiver<ChangeEvent>) -> Self {
        Self {
            spec,
            receiver,
            shutdown: None,
            task: None,
        }
    }

    /// Feed backed by a background connection task
    pub fn with_task(
        spec: FeedSpec,
        receiver: mpsc::Receiver<ChangeEvent>,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            spec,
            receiver,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    pub fn spec(&self) -> &FeedSpec {
        &self.spec
    }

    /// Next event; `None` once the feed is closed
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Next buffered event without waiting
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Stop delivery and wait for the connection task to finish
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.receiver.close();
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, task).await.is_err() {
                tracing::warn!("Realtime feed for {} did not stop in time", self.spec.table);
            }
        }
        tracing::debug!("Closed change feed on {}", self.spec.topic());
    }

    pub fn into_stream(mut self) -> impl Stream<Item = ChangeEvent> {
        async_stream::stream! {
            while let Some(event) = self.receiver.recv().await {
                yield event;
            }
        }
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("topic", &self.spec.topic())
            .field("closed", &self.receiver.is_closed())
            .finish()
    }
}

/// Text value of `column` in the new row image, else in the old one
pub fn event_column(event: &ChangeEvent, column: &str) -> Option<String> {
    event
        .record
        .as_ref()
        .and_then(|r| r.get(column))
        .or_else(|| event.old_record.as_ref().and_then(|r| r.get(column)))
        .map(scalar_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_matches_filtered_inserts() {
        let spec = FeedSpec::new("messages").on(FeedEvent::Insert).filter_eq("channel_id", "c1");
        assert_eq!(spec.filter_expr().as_deref(), Some("channel_id=eq.c1"));

        let hit = ChangeEvent::insert("messages", json!({"id": "m1", "channel_id": "c1"}));
        let other_channel = ChangeEvent::insert("messages", json!({"id": "m2", "channel_id": "c2"}));
        let update = ChangeEvent::update("messages", json!({"id": "m1", "channel_id": "c1"}), None);
        assert!(spec.matches(&hit));
        assert!(!spec.matches(&other_channel));
        assert!(!spec.matches(&update));
    }

    #[test]
    fn test_delete_with_key_only_passes_filter() {
        let spec = FeedSpec::new("channel_members").filter_eq("user_id", "u1");
        let delete = ChangeEvent::delete("channel_members", json!({"id": "row-1"}));
        assert!(spec.matches(&delete));
        let foreign = ChangeEvent::delete("channel_members", json!({"id": "row-2", "user_id": "u2"}));
        assert!(!spec.matches(&foreign));
    }

    #[tokio::test]
    async fn test_close_ends_delivery() {
        let (tx, rx) = mpsc::channel(4);
        let feed = ChangeFeed::new(FeedSpec::new("messages"), rx);
        feed.close().await;
        assert!(tx.is_closed());
    }
}
