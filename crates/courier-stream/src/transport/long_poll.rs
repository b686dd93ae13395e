//! HTTP long-poll frame source
//!
//! Issues repeated GET requests against the numbered edge hosts; the server
//! holds each request open (~50 s) until data arrives. Load-balancer
//! (`lb`) frames carry the sticky token/pool that later requests must echo
//! back, and channel-error statuses move the source to the next edge shard.

use super::{FrameSource, RawFrame};
use crate::resume::ResumePayload;
use async_trait::async_trait;
use courier_common::{ListenError, ListenResult};
use courier_core::ActorId;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::session::TransportSession;

/// Long-poll frame source over an authenticated transport session
pub struct LongPollSource<T> {
    session: Arc<T>,
    domain: String,
    shard: u8,
    shard_count: u8,
    viewer: ActorId,
    client_id: String,
    sticky_token: Option<String>,
    sticky_pool: Option<String>,
    msgs_recv: u64,
    seq: i64,
}

impl<T: TransportSession> LongPollSource<T> {
    /// Create a source over `session`, polling the edge hosts of `domain`
    pub fn new(session: Arc<T>, domain: impl Into<String>, shard_count: u8, viewer: ActorId) -> Self {
        Self {
            session,
            domain: domain.into(),
            shard: 0,
            shard_count: shard_count.max(1),
            viewer,
            client_id: uuid::Uuid::new_v4().simple().to_string(),
            sticky_token: None,
            sticky_pool: None,
            msgs_recv: 0,
            seq: 0,
        }
    }

    fn pull_url(&self) -> String {
        format!("https://{}-{}/pull", self.shard, self.domain)
    }

    fn ping_url(&self) -> String {
        format!("https://{}-{}/active_ping", self.shard, self.domain)
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("clientid", self.client_id.clone()),
            ("msgs_recv", self.msgs_recv.to_string()),
            ("seq", self.seq.to_string()),
            ("state", "active".to_string()),
        ];
        if let Some(token) = &self.sticky_token {
            params.push(("sticky_token", token.clone()));
        }
        if let Some(pool) = &self.sticky_pool {
            params.push(("sticky_pool", pool.clone()));
        }
        params
    }

    /// Fold load-balancer info and bookkeeping counters out of a frame
    fn track(&mut self, payload: &Value) {
        if let Some(lb_info) = payload.get("lb_info") {
            self.sticky_token = lb_info.get("sticky").map(json_to_param);
            self.sticky_pool = lb_info.get("pool").map(json_to_param);
            tracing::debug!(shard = self.shard, "Sticky token refreshed");
        }

        for field in ["seq", "s"] {
            if let Some(seq) = int_field(payload, field) {
                if seq > self.seq {
                    self.seq = seq;
                }
            }
        }

        if let Some(ms) = payload.get("ms").and_then(Value::as_array) {
            self.msgs_recv += ms.len() as u64;
        }
    }
}

#[async_trait]
impl<T: TransportSession> FrameSource for LongPollSource<T> {
    async fn connect(&mut self, resume: &ResumePayload) -> ListenResult<()> {
        // The pull channel is stateless between requests; a "connect" just
        // aligns the cursor with the resumption state.
        if resume.sequence_id > self.seq {
            self.seq = resume.sequence_id;
        }
        self.msgs_recv = 0;
        Ok(())
    }

    async fn next_frame(&mut self, timeout: Duration) -> ListenResult<Option<RawFrame>> {
        let result = self
            .session
            .get(&self.pull_url(), &self.params(), timeout)
            .await;

        let body = match result {
            Ok(body) => body,
            Err(ListenError::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        };

        let frame = RawFrame::from_pull_body(&body)?;
        self.track(&frame.payload);
        Ok(Some(frame))
    }

    async fn ping(&mut self) -> ListenResult<()> {
        let mut params = vec![
            ("clientid", self.client_id.clone()),
            ("viewer_uid", self.viewer.to_string()),
            ("state", "active".to_string()),
        ];
        if let Some(token) = &self.sticky_token {
            params.push(("sticky_token", token.clone()));
        }
        if let Some(pool) = &self.sticky_pool {
            params.push(("sticky_pool", pool.clone()));
        }

        self.session
            .get(&self.ping_url(), &params, Duration::from_secs(10))
            .await?;
        Ok(())
    }

    fn rotate_shard(&mut self) {
        self.shard = (self.shard + 1) % self.shard_count;
        tracing::info!(shard = self.shard, "Rotated long-poll edge shard");
    }

    async fn disconnect(&mut self) {
        // Nothing held open between requests.
    }
}

/// Render a sticky value the way the upstream expects it echoed back
fn json_to_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn int_field(value: &Value, field: &str) -> Option<i64> {
    match value.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
