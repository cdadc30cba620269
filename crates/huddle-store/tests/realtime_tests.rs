use std::time::Duration;

use futures::{SinkExt, StreamExt};
use huddle_store::realtime::PhoenixMessage;
use huddle_store::{FeedEvent, FeedSpec, RealtimeClient};
use huddle_types::ChangeKind;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

/// Accept one socket, acknowledge the join, push one change and report the frame sent on close
async fn spawn_server() -> (String, oneshot::Receiver<PhoenixMessage>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

        let join = loop {
            if let Some(Ok(Message::Text(text))) = socket.next().await {
                break serde_json::from_str::<PhoenixMessage>(&text).unwrap();
            }
        };
        assert_eq!(join.event, "phx_join");
        assert_eq!(
            join.payload["config"]["postgres_changes"][0]["filter"],
            "channel_id=eq.c1"
        );

        let reply = json!({
            "topic": join.topic,
            "event": "phx_reply",
            "payload": {"status": "ok", "response": {"postgres_changes": [{"id": 1}]}},
            "ref": join.reference,
        });
        socket.send(Message::Text(reply.to_string())).await.unwrap();

        let change = json!({
            "topic": join.topic,
            "event": "postgres_changes",
            "payload": {"ids": [1], "data": {
                "schema": "public",
                "table": "messages",
                "type": "INSERT",
                "commit_timestamp": "2024-03-01T10:00:00Z",
                "record": {"id": "m1", "channel_id": "c1", "content": "hello"},
                "old_record": {}
            }},
            "ref": null,
        });
        socket.send(Message::Text(change.to_string())).await.unwrap();

        while let Some(Ok(frame)) = socket.next().await {
            if let Message::Text(text) = frame {
                let message: PhoenixMessage = serde_json::from_str(&text).unwrap();
                if message.event == "phx_leave" {
                    let _ = done_tx.send(message);
                    break;
                }
            }
        }
    });

    (address, done_rx)
}

#[tokio::test]
async fn test_feed_delivers_changes_and_leaves_on_close() {
    let (address, done) = spawn_server().await;
    let client = RealtimeClient::new(&address, "anon-key")
        .unwrap()
        .with_heartbeat(Duration::from_secs(60));

    let spec = FeedSpec::new("messages").on(FeedEvent::Insert).filter_eq("channel_id", "c1");
    let mut feed = client.subscribe(spec).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), feed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.kind, ChangeKind::Insert);
    assert_eq!(event.new_str("content"), Some("hello"));

    feed.close().await;
    let leave = tokio::time::timeout(Duration::from_secs(5), done).await.unwrap().unwrap();
    assert_eq!(leave.topic, "realtime:public:messages:channel_id=eq.c1");
}
