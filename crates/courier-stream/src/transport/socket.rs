//! Persistent socket frame source
//!
//! One long-lived websocket carrying topic-addressed JSON in both
//! directions. The connect handshake subscribes to the delta topics and
//! publishes the resume request; frames then arrive asynchronously per
//! topic until the connection drops.

use super::{FrameSource, RawFrame};
use crate::resume::ResumePayload;
use async_trait::async_trait;
use courier_common::{ListenError, ListenResult};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Topics the connect handshake subscribes to
pub const SUBSCRIBE_TOPICS: &[&str] = &[
    "/t_ms",
    "/thread_typing",
    "/orca_typing_notifications",
    "/orca_presence",
    "/legacy_web",
];

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Persistent topic-addressed socket source
pub struct SocketSource {
    domain: String,
    connect_timeout: Duration,
    ws: Option<Socket>,
}

impl SocketSource {
    /// Create a source that connects to the socket endpoint of `domain`
    #[must_use]
    pub fn new(domain: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            domain: domain.into(),
            connect_timeout,
            ws: None,
        }
    }

    fn endpoint(&self, session_id: u64) -> String {
        format!("wss://{}/chat?sid={session_id}", self.domain)
    }

    fn socket(&mut self) -> ListenResult<&mut Socket> {
        self.ws
            .as_mut()
            .ok_or_else(|| ListenError::ConnectionLost("socket not connected".to_string()))
    }

    async fn send_json(&mut self, value: &Value) -> ListenResult<()> {
        let text = value.to_string();
        self.socket()?
            .send(Message::Text(text))
            .await
            .map_err(|e| ListenError::ConnectionLost(e.to_string()))
    }
}

/// The handshake envelope: subscribes the session to its topics
fn connect_envelope(session_id: u64) -> Value {
    json!({
        "type": "connect",
        "sessionId": session_id,
        "subscribe": SUBSCRIBE_TOPICS,
    })
}

/// The resume publish: creates or resumes the server-side queue
fn publish_envelope(resume: &ResumePayload) -> Value {
    json!({
        "type": "publish",
        "topic": resume.topic,
        "payload": resume.body,
    })
}

#[async_trait]
impl FrameSource for SocketSource {
    async fn connect(&mut self, resume: &ResumePayload) -> ListenResult<()> {
        let url = self.endpoint(resume.session_id);

        let connected = tokio::time::timeout(self.connect_timeout, connect_async(&url))
            .await
            .map_err(|_| ListenError::ConnectionLost("socket connect timed out".to_string()))?
            .map_err(|e| ListenError::ConnectionLost(e.to_string()))?;

        self.ws = Some(connected.0);

        self.send_json(&connect_envelope(resume.session_id)).await?;
        self.send_json(&publish_envelope(resume)).await?;

        tracing::info!(
            session_id = resume.session_id,
            create_queue = resume.is_create_queue(),
            "Socket connected and resume published"
        );
        Ok(())
    }

    async fn next_frame(&mut self, timeout: Duration) -> ListenResult<Option<RawFrame>> {
        loop {
            let message = match tokio::time::timeout(timeout, self.socket()?.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => {
                    return Err(ListenError::ConnectionLost("socket closed".to_string()));
                }
                Ok(Some(Err(e))) => return Err(ListenError::ConnectionLost(e.to_string())),
                Ok(Some(Ok(message))) => message,
            };

            match message {
                Message::Text(text) => return RawFrame::from_socket_json(&text).map(Some),
                Message::Binary(bytes) => {
                    let text = String::from_utf8(bytes)
                        .map_err(|_| ListenError::malformed("binary frame is not UTF-8"))?;
                    return RawFrame::from_socket_json(&text).map(Some);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    // Control traffic; keep reading within the same bound
                }
                Message::Close(_) => {
                    return Err(ListenError::ConnectionLost(
                        "server closed the socket".to_string(),
                    ));
                }
            }
        }
    }

    async fn ping(&mut self) -> ListenResult<()> {
        self.socket()?
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| ListenError::ConnectionLost(e.to_string()))
    }

    async fn disconnect(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            ws.close(None).await.ok();
        }
    }
}
