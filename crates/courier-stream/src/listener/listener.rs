//! The listener
//!
//! Owns the resumption state, drives one frame source, and turns frames
//! into a clean ordered event stream. Strictly sequential: one frame is
//! fully decoded and classified before the next read begins. The loop runs
//! on its own task; `stop()` flips an atomic flag that every iteration
//! checks, and every blocking read is time-bounded so the flag is observed
//! promptly.

use super::event_stream::EventStream;
use super::state::{ListenerState, StateCell};
use crate::classify::classify;
use crate::decode::{DeltaDecoder, DeltaRecord};
use crate::resume::ResumptionState;
use crate::transport::FrameSource;
use courier_common::{ListenConfig, ListenError};
use courier_core::events::{ConnectedEvent, DisconnectReason, DisconnectedEvent};
use courier_core::{ActorId, DomainError, Event};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

/// Liveness ping cadence while keepalive is enabled
const PING_INTERVAL: Duration = Duration::from_secs(50);

/// State shared between the read loop and the caller's handle
#[derive(Debug)]
struct Shared {
    state: StateCell,
    stop: AtomicBool,
    keepalive: AtomicBool,
    decode_failures: AtomicU64,
}

/// What the loop does after a triaged error
enum LoopStep {
    /// Keep reading on the current connection
    Continue,
    /// Tear down and reconnect
    Reconnect,
    /// End the loop
    Stop(DisconnectReason),
}

/// The read loop driver. Construct with a frame source and the initial
/// sequence id (fetched out of band), then `start()`.
pub struct Listener<S> {
    source: S,
    config: ListenConfig,
    viewer: ActorId,
    resume: ResumptionState,
    shared: Arc<Shared>,
}

impl<S: FrameSource + 'static> Listener<S> {
    /// Create a listener.
    ///
    /// `initial_sequence_id` is the current position in the remote log,
    /// obtained from the one-shot out-of-band query.
    pub fn new(source: S, config: ListenConfig, viewer: ActorId, initial_sequence_id: i64) -> Self {
        let keepalive = config.keepalive;
        Self {
            source,
            config,
            viewer,
            resume: ResumptionState::new(initial_sequence_id),
            shared: Arc::new(Shared {
                state: StateCell::new(ListenerState::Idle),
                stop: AtomicBool::new(false),
                keepalive: AtomicBool::new(keepalive),
                decode_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Start the read loop on its own task.
    ///
    /// Returns a control handle and the event stream. The stream yields
    /// `Connected` after each successful (re)connect and ends with a
    /// `Disconnected` carrying the stop reason.
    pub fn start(self) -> (ListenerHandle, EventStream) {
        self.shared.state.store(ListenerState::Connecting);

        let (tx, rx) = mpsc::channel(self.config.event_buffer);
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(self.run(tx));

        (
            ListenerHandle {
                shared,
                task: Mutex::new(Some(task)),
            },
            EventStream::new(rx),
        )
    }

    async fn run(mut self, tx: mpsc::Sender<Event>) {
        let reason = self.run_loop(&tx).await;
        self.source.disconnect().await;

        tracing::info!(
            session_id = self.resume.session_id(),
            sequence_id = self.resume.sequence_id(),
            reason = ?reason,
            "Listener stopped"
        );

        self.shared.state.store(ListenerState::Stopped);
        tx.send(Event::Disconnected(DisconnectedEvent { reason }))
            .await
            .ok();
    }

    fn stopping(&self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }

    async fn run_loop(&mut self, tx: &mpsc::Sender<Event>) -> DisconnectReason {
        loop {
            if self.stopping() {
                return DisconnectReason::Requested;
            }

            self.shared.state.store(ListenerState::Connecting);
            let resume = self.resume.build_resume_payload(self.viewer);

            match self.source.connect(&resume).await {
                Ok(()) => {
                    self.shared.state.store(ListenerState::Listening);
                    tracing::info!(
                        session_id = resume.session_id,
                        sequence_id = resume.sequence_id,
                        create_queue = resume.is_create_queue(),
                        "Transport connected"
                    );
                    if tx
                        .send(Event::Connected(ConnectedEvent {
                            session_id: resume.session_id,
                        }))
                        .await
                        .is_err()
                    {
                        return DisconnectReason::Requested;
                    }
                }
                Err(e) => match self.triage(e).await {
                    LoopStep::Stop(reason) => return reason,
                    LoopStep::Continue | LoopStep::Reconnect => continue,
                },
            }

            if let Some(reason) = self.read_frames(tx).await {
                return reason;
            }
            // Fell out of the read loop without a reason: reconnect.
        }
    }

    /// Read frames until the connection needs re-establishing (`None`) or
    /// the loop must end (`Some(reason)`).
    async fn read_frames(&mut self, tx: &mpsc::Sender<Event>) -> Option<DisconnectReason> {
        let mut last_ping = Instant::now();

        loop {
            if self.stopping() {
                return Some(DisconnectReason::Requested);
            }

            if self.shared.keepalive.load(Ordering::SeqCst) && last_ping.elapsed() >= PING_INTERVAL
            {
                last_ping = Instant::now();
                if let Err(e) = self.source.ping().await {
                    match self.triage(e).await {
                        LoopStep::Continue => {}
                        LoopStep::Reconnect => return None,
                        LoopStep::Stop(reason) => return Some(reason),
                    }
                    continue;
                }
            }

            let frame = match self.source.next_frame(self.config.read_timeout()).await {
                Ok(Some(frame)) => frame,
                // Bound elapsed without data; loop around (and re-check stop)
                Ok(None) => continue,
                Err(e) => match self.triage(e).await {
                    LoopStep::Continue => continue,
                    LoopStep::Reconnect => return None,
                    LoopStep::Stop(reason) => return Some(reason),
                },
            };

            let resync = self.resume.absorb(&frame.payload);

            let decoded = DeltaDecoder::decode(&frame);
            for failure in &decoded.failures {
                self.report_decode_failure(&frame.topic, failure);
            }

            for record in &decoded.records {
                match classify(record) {
                    Ok(Some(event)) => {
                        if tx.send(event).await.is_err() {
                            // Receiver dropped; nobody is listening anymore
                            return Some(DisconnectReason::Requested);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => self.report_classify_failure(record, &e),
                }
            }

            if resync {
                // The server-side queue is gone; reconnect recreates it
                return None;
            }
        }
    }

    /// Apply the error taxonomy to one transport failure
    async fn triage(&mut self, error: ListenError) -> LoopStep {
        if !error.is_recoverable() {
            tracing::error!(error = %error, "Unrecoverable transport error; stopping");
            return LoopStep::Stop(DisconnectReason::Error(error.to_string()));
        }

        if matches!(error, ListenError::Timeout) {
            return LoopStep::Continue;
        }

        if error.is_record_scoped() {
            tracing::warn!(error = %error, "Skipping malformed frame");
            self.shared.decode_failures.fetch_add(1, Ordering::SeqCst);
            return LoopStep::Continue;
        }

        tracing::warn!(error = %error, code = error.code(), "Recoverable transport error");

        if error.rotates_shard() {
            self.source.rotate_shard();
        }
        if error.requires_cooldown() {
            tokio::time::sleep(self.config.cooldown()).await;
        }
        LoopStep::Reconnect
    }

    fn report_decode_failure(&self, topic: &str, failure: &ListenError) {
        tracing::warn!(topic = %topic, error = %failure, "Dropped undecodable delta");
        self.shared.decode_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn report_classify_failure(&self, record: &DeltaRecord, error: &DomainError) {
        tracing::warn!(
            source = %record.source_label(),
            error = %error,
            code = error.code(),
            "Dropped unclassifiable delta"
        );
        self.shared.decode_failures.fetch_add(1, Ordering::SeqCst);
    }
}

/// Control handle for a running listener. Safe to use from any task.
pub struct ListenerHandle {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ListenerHandle {
    /// Request the loop to stop. Observed within one bounded iteration;
    /// calling it more than once, or concurrently, is fine.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ListenerState {
        self.shared.state.load()
    }

    /// Toggle the liveness ping
    pub fn set_keepalive(&self, enabled: bool) {
        self.shared.keepalive.store(enabled, Ordering::SeqCst);
    }

    /// Whether the liveness ping is enabled
    #[must_use]
    pub fn keepalive(&self) -> bool {
        self.shared.keepalive.load(Ordering::SeqCst)
    }

    /// How many deltas were dropped as undecodable or unclassifiable.
    /// The event stream itself never surfaces these.
    #[must_use]
    pub fn decode_failures(&self) -> u64 {
        self.shared.decode_failures.load(Ordering::SeqCst)
    }

    /// Wait for the loop task to finish
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await.ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::ResumePayload;
    use crate::transport::RawFrame;
    use async_trait::async_trait;
    use courier_common::ListenResult;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Scripted frame source: pops one canned result per read. An empty
    /// script reads as a benign timeout (with a short pause so tests do not
    /// spin hot).
    struct ScriptedSource {
        reads: Mutex<VecDeque<ListenResult<Option<Value>>>>,
        connects: Arc<Mutex<Vec<ResumePayload>>>,
        rotations: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(reads: Vec<ListenResult<Option<Value>>>) -> Self {
            Self {
                reads: Mutex::new(reads.into_iter().collect()),
                connects: Arc::new(Mutex::new(Vec::new())),
                rotations: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl FrameSource for ScriptedSource {
        async fn connect(&mut self, resume: &ResumePayload) -> ListenResult<()> {
            self.connects.lock().push(resume.clone());
            Ok(())
        }

        async fn next_frame(&mut self, _timeout: Duration) -> ListenResult<Option<RawFrame>> {
            let next = self.reads.lock().pop_front();
            match next {
                Some(result) => result.map(|p| p.map(|payload| RawFrame::new("/t_ms", payload))),
                None => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(None)
                }
            }
        }

        async fn ping(&mut self) -> ListenResult<()> {
            Ok(())
        }

        fn rotate_shard(&mut self) {
            self.rotations.fetch_add(1, Ordering::SeqCst);
        }

        async fn disconnect(&mut self) {}
    }

    fn test_config() -> ListenConfig {
        ListenConfig {
            cooldown_secs: 0,
            ..ListenConfig::default()
        }
    }

    fn message_payload(n: u64) -> Value {
        json!({
            "lastIssuedSeqId": n,
            "deltas": [{
                "class": "NewMessage",
                "body": "hi",
                "messageMetadata": {
                    "actorFbId": "1",
                    "threadKey": {"threadFbId": "2"},
                    "timestamp": "1600000000000",
                    "messageId": format!("mid.{n}"),
                },
            }],
        })
    }

    #[tokio::test]
    async fn test_frames_become_events_in_order() {
        let source = ScriptedSource::new(vec![
            Ok(Some(message_payload(1))),
            Ok(Some(message_payload(2))),
        ]);
        let listener = Listener::new(source, test_config(), ActorId::new(7), 0);
        let (handle, mut events) = listener.start();

        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");

        for expected in ["mid.1", "mid.2"] {
            match events.recv().await.unwrap() {
                Event::Message(e) => assert_eq!(e.message_id, expected),
                other => panic!("unexpected event: {}", other.event_type()),
            }
        }

        handle.stop();
        handle.join().await;
        assert_eq!(handle.state(), ListenerState::Stopped);
    }

    #[tokio::test]
    async fn test_timeout_keeps_listening_and_emits_nothing() {
        let source = ScriptedSource::new(vec![Ok(None), Ok(None)]);
        let listener = Listener::new(source, test_config(), ActorId::new(7), 0);
        let (handle, mut events) = listener.start();

        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(handle.state(), ListenerState::Listening);
        assert!(events.try_recv().is_none());

        handle.stop();
        handle.join().await;
        assert_eq!(
            events.recv().await.unwrap().event_type(),
            "DISCONNECTED"
        );
    }

    #[tokio::test]
    async fn test_stop_from_another_task() {
        let source = ScriptedSource::new(vec![]);
        let listener = Listener::new(source, test_config(), ActorId::new(7), 0);
        let (handle, mut events) = listener.start();
        let handle = Arc::new(handle);

        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");

        let stopper = Arc::clone(&handle);
        tokio::spawn(async move { stopper.stop() });

        match events.recv().await.unwrap() {
            Event::Disconnected(e) => assert_eq!(e.reason, DisconnectReason::Requested),
            other => panic!("unexpected event: {}", other.event_type()),
        }
        handle.join().await;
        assert_eq!(handle.state(), ListenerState::Stopped);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_with_reason() {
        let source = ScriptedSource::new(vec![Err(ListenError::fatal(anyhow::anyhow!("boom")))]);
        let listener = Listener::new(source, test_config(), ActorId::new(7), 0);
        let (handle, mut events) = listener.start();

        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
        match events.recv().await.unwrap() {
            Event::Disconnected(e) => {
                assert!(matches!(e.reason, DisconnectReason::Error(_)));
            }
            other => panic!("unexpected event: {}", other.event_type()),
        }

        handle.join().await;
        assert_eq!(handle.state(), ListenerState::Stopped);
    }

    #[tokio::test]
    async fn test_channel_error_rotates_shard_and_reconnects() {
        let source = ScriptedSource::new(vec![Err(ListenError::ChannelError { status: 503 })]);
        let rotations = Arc::clone(&source.rotations);
        let connects = Arc::clone(&source.connects);

        let listener = Listener::new(source, test_config(), ActorId::new(7), 0);
        let (handle, mut events) = listener.start();

        // Connected once, then again after the rotation
        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");

        assert_eq!(rotations.load(Ordering::SeqCst), 1);
        assert!(connects.lock().len() >= 2);

        handle.stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_connection_lost_reconnects_with_resume() {
        let source = ScriptedSource::new(vec![
            Ok(Some(json!({"syncToken": "tok", "firstDeltaSeqId": 11}))),
            Err(ListenError::ConnectionLost("reset".to_string())),
        ]);
        let connects = Arc::clone(&source.connects);

        let listener = Listener::new(source, test_config(), ActorId::new(7), 1);
        let (handle, mut events) = listener.start();

        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");

        {
            let connects = connects.lock();
            // First connect creates the queue; the reconnect resumes it
            assert!(connects[0].is_create_queue());
            assert!(!connects[1].is_create_queue());
            assert_eq!(connects[1].sequence_id, 11);
        }

        handle.stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_server_resync_recreates_queue() {
        let source = ScriptedSource::new(vec![
            Ok(Some(json!({"syncToken": "tok"}))),
            Ok(Some(json!({"errorCode": "ERROR_QUEUE_OVERFLOW"}))),
        ]);
        let connects = Arc::clone(&source.connects);

        let listener = Listener::new(source, test_config(), ActorId::new(7), 1);
        let (handle, mut events) = listener.start();

        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");

        {
            let connects = connects.lock();
            assert!(connects[0].is_create_queue());
            // The resync cleared the token, so the queue is recreated
            assert!(connects[1].is_create_queue());
        }

        handle.stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_undecodable_delta_counts_without_stopping() {
        let source = ScriptedSource::new(vec![
            Ok(Some(json!({
                "deltas": [
                    {"class": "ClientPayload", "payload": "garbage"},
                    {"class": "NoOp"},
                ]
            }))),
            Ok(Some(message_payload(5))),
        ]);
        let listener = Listener::new(source, test_config(), ActorId::new(7), 0);
        let (handle, mut events) = listener.start();

        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
        // The stream stays clean: next event is the later message
        assert_eq!(events.recv().await.unwrap().event_type(), "MESSAGE");
        assert_eq!(handle.decode_failures(), 1);

        handle.stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_set_keepalive_toggles() {
        let source = ScriptedSource::new(vec![]);
        let listener = Listener::new(source, test_config(), ActorId::new(7), 0);
        let (handle, mut events) = listener.start();

        assert_eq!(events.recv().await.unwrap().event_type(), "CONNECTED");
        assert!(handle.keepalive());
        handle.set_keepalive(false);
        assert!(!handle.keepalive());

        handle.stop();
        handle.join().await;
    }
}
