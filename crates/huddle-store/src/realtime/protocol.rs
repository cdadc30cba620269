// Phoenix channel framing used by the realtime server (vsn 1.0.0, JSON objects)

use huddle_types::{ChangeEvent, ChangeKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::feed::FeedSpec;

pub const HEARTBEAT_TOPIC: &str = "phoenix";

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    pub fn join(spec: &FeedSpec, access_token: Option<&str>, reference: u64) -> Self {
        let mut change = json!({
            "event": spec.event.as_str(),
            "schema": spec.schema,
            "table": spec.table,
        });
        if let Some(filter) = spec.filter_expr() {
            change["filter"] = Value::String(filter);
        }

        let mut payload = json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [change],
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }

        Self {
            topic: spec.topic(),
            event: EVENT_JOIN.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    pub fn leave(topic: &str, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: HEARTBEAT_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    /// Status of a `phx_reply` frame (`ok` / `error`)
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != EVENT_REPLY {
            return None;
        }
        self.payload.get("status")?.as_str()
    }
}

/// Convert a server push into a row change, if it is one.
///
/// Accepts the `postgres_changes` envelope (`payload.data`) and the older
/// form where the event name is the change type and the payload is the row data.
pub fn parse_change(message: &PhoenixMessage) -> Option<ChangeEvent> {
    let data = if message.event == EVENT_POSTGRES_CHANGES {
        message.payload.get("data")?
    } else if matches!(message.event.as_str(), "INSERT" | "UPDATE" | "DELETE") {
        &message.payload
    } else {
        return None;
    };

    let kind_text = data
        .get("type")
        .or_else(|| data.get("eventType"))
        .and_then(Value::as_str)
        .unwrap_or(message.event.as_str());
    let kind = match kind_text {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        _ => return None,
    };

    let row = |primary: &str, alternate: &str| {
        data.get(primary)
            .or_else(|| data.get(alternate))
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
            .cloned()
    };

    Some(ChangeEvent {
        kind,
        schema: data.get("schema")?.as_str()?.to_string(),
        table: data.get("table")?.as_str()?.to_string(),
        record: row("record", "new"),
        old_record: row("old_record", "old"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_payload() {
        let spec = FeedSpec::new("messages").filter_eq("channel_id", "7");
        let join = PhoenixMessage::join(&spec, Some("jwt"), 1);
        let value = serde_json::to_value(&join).unwrap();

        assert_eq!(value["event"], "phx_join");
        assert_eq!(value["ref"], "1");
        assert_eq!(value["topic"], "realtime:public:messages:channel_id=eq.7");
        let change = &value["payload"]["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "*");
        assert_eq!(change["filter"], "channel_id=eq.7");
        assert_eq!(value["payload"]["access_token"], "jwt");
    }

    #[test]
    fn test_parse_postgres_changes() {
        let raw = r#"{
            "topic": "realtime:public:messages",
            "event": "postgres_changes",
            "payload": {"ids": [1], "data": {
                "schema": "public", "table": "messages", "type": "INSERT",
                "record": {"id": "m1", "content": "hi"}, "old_record": {}
            }},
            "ref": null
        }"#;
        let message: PhoenixMessage = serde_json::from_str(raw).unwrap();
        let change = parse_change(&message).unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.table, "messages");
        assert_eq!(change.new_str("content"), Some("hi"));
        assert!(change.old_record.is_none());
    }

    #[test]
    fn test_parse_legacy_delete() {
        let message = PhoenixMessage {
            topic: "realtime:public:ai_chats".to_string(),
            event: "DELETE".to_string(),
            payload: json!({"schema": "public", "table": "ai_chats", "old_record": {"id": "c1"}}),
            reference: None,
        };
        let change = parse_change(&message).unwrap();
        assert_eq!(change.kind, ChangeKind::Delete);
        assert_eq!(change.old_str("id"), Some("c1"));
    }

    #[test]
    fn test_ignores_replies() {
        let reply = PhoenixMessage {
            topic: "phoenix".to_string(),
            event: EVENT_REPLY.to_string(),
            payload: json!({"status": "ok", "response": {}}),
            reference: Some("2".to_string()),
        };
        assert!(parse_change(&reply).is_none());
        assert_eq!(reply.reply_status(), Some("ok"));
    }
}
