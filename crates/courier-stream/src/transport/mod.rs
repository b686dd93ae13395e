//! Frame transports
//!
//! Two implementations share the `FrameSource` contract: repeated HTTP
//! long-polling and a persistent topic-addressed socket. Both present a
//! blocking, timeout-bounded sequence of raw frames to the listener.

mod frame;
mod long_poll;
mod session;
mod socket;

pub use frame::{strip_anti_hijack_prefix, RawFrame, PULL_TOPIC, SYNC_TOPIC};
pub use long_poll::LongPollSource;
pub use session::{HttpTransport, TransportSession};
pub use socket::SocketSource;

use crate::resume::ResumePayload;
use async_trait::async_trait;
use courier_common::ListenResult;
use std::time::Duration;

/// A unified source of raw frames.
///
/// Implementations must treat a read timeout as non-fatal (`Ok(None)`) and
/// report lost connections as `ListenError::ConnectionLost` so the listener
/// can apply its cool-down before retrying.
#[async_trait]
pub trait FrameSource: Send {
    /// Establish (or re-establish) the channel, announcing `resume` so the
    /// server replays from the right point.
    async fn connect(&mut self, resume: &ResumePayload) -> ListenResult<()>;

    /// Read one frame, bounded by `timeout`. `Ok(None)` means the bound
    /// elapsed without data, which is expected and benign.
    async fn next_frame(&mut self, timeout: Duration) -> ListenResult<Option<RawFrame>>;

    /// Send a liveness ping.
    async fn ping(&mut self) -> ListenResult<()>;

    /// Move to the next endpoint shard (bounded, cyclic). Sources without
    /// shards ignore this.
    fn rotate_shard(&mut self) {}

    /// Tear the channel down.
    async fn disconnect(&mut self);
}
