// Realtime change feeds over the Phoenix WebSocket protocol

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use huddle_types::ChangeEvent;

use super::protocol::{self, PhoenixMessage};
use crate::error::{Result, StoreError};
use crate::feed::{ChangeFeed, FeedSpec};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const FEED_BUFFER: usize = 256;
const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RealtimeClient {
    socket_url: Url,
    access_token: Option<String>,
    heartbeat: Duration,
}

impl RealtimeClient {
    /// Derive the socket endpoint from the store's HTTP base URL
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base = base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };

        let mut socket_url = Url::parse(&format!("{}/realtime/v1/websocket", ws_base))
            .map_err(|e| StoreError::Config(format!("Invalid realtime URL {}: {}", base_url, e)))?;
        socket_url
            .query_pairs_mut()
            .append_pair("apikey", api_key)
            .append_pair("vsn", "1.0.0");

        Ok(Self {
            socket_url,
            access_token: None,
            heartbeat: DEFAULT_HEARTBEAT,
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = interval;
        self
    }

    pub fn socket_url(&self) -> &Url {
        &self.socket_url
    }

    /// Connect, join the feed topic and hand the connection to a background task
    pub async fn subscribe(&self, spec: FeedSpec) -> Result<ChangeFeed> {
        let (socket, _) = connect_async(self.socket_url.as_str())
            .await
            .map_err(|e| StoreError::Realtime(format!("Failed to connect: {}", e)))?;
        let (mut sink, mut stream) = socket.split();

        let topic = spec.topic();
        let join = PhoenixMessage::join(&spec, self.access_token.as_deref(), 1);
        send_frame(&mut sink, &join).await?;

        tokio::time::timeout(JOIN_TIMEOUT, wait_for_join(&mut stream, &topic, "1"))
            .await
            .map_err(|_| StoreError::Realtime(format!("Timed out joining {}", topic)))??;

        tracing::debug!("Joined realtime topic {}", topic);

        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_feed(
            sink,
            stream,
            spec.clone(),
            tx,
            shutdown_rx,
            self.heartbeat,
        ));

        Ok(ChangeFeed::with_task(spec, rx, shutdown_tx, task))
    }
}

async fn send_frame(sink: &mut SplitSink<Socket, Message>, message: &PhoenixMessage) -> Result<()> {
    let text = serde_json::to_string(message)?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| StoreError::Realtime(format!("Failed to send {}: {}", message.event, e)))
}

async fn wait_for_join(stream: &mut SplitStream<Socket>, topic: &str, reference: &str) -> Result<()> {
    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| StoreError::Realtime(e.to_string()))?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let message: PhoenixMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(_) => continue,
        };
        if message.topic != topic || message.reference.as_deref() != Some(reference) {
            continue;
        }
        return match message.reply_status() {
            Some("ok") => Ok(()),
            _ => Err(StoreError::Realtime(format!(
                "Join rejected for {}: {}",
                topic, message.payload
            ))),
        };
    }
    Err(StoreError::Realtime(format!("Connection closed while joining {}", topic)))
}

async fn run_feed(
    mut sink: SplitSink<Socket, Message>,
    mut stream: SplitStream<Socket>,
    spec: FeedSpec,
    tx: mpsc::Sender<ChangeEvent>,
    mut shutdown: oneshot::Receiver<()>,
    heartbeat: Duration,
) {
    let topic = spec.topic();
    let mut next_ref: u64 = 2;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + heartbeat, heartbeat);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tx.closed() => break,
            _ = ticker.tick() => {
                let beat = PhoenixMessage::heartbeat(next_ref);
                next_ref += 1;
                if let Err(e) = send_frame(&mut sink, &beat).await {
                    tracing::warn!("Realtime heartbeat failed on {}: {}", topic, e);
                    return;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let message: PhoenixMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                tracing::debug!("Skipping unreadable realtime frame: {}", e);
                                continue;
                            }
                        };
                        if message.topic != topic {
                            continue;
                        }
                        if message.event == protocol::EVENT_ERROR || message.event == protocol::EVENT_CLOSE {
                            tracing::warn!("Realtime topic {} closed by server ({})", topic, message.event);
                            return;
                        }
                        if let Some(change) = protocol::parse_change(&message) {
                            if spec.matches(&change) && tx.send(change).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Realtime connection for {} closed", topic);
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("Realtime connection error on {}: {}", topic, e);
                        return;
                    }
                }
            }
        }
    }

    let leave = PhoenixMessage::leave(&topic, next_ref);
    if let Err(e) = send_frame(&mut sink, &leave).await {
        tracing::debug!("Could not send leave for {}: {}", topic, e);
    }
    let _ = sink.send(Message::Close(None)).await;
}
