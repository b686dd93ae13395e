//! Test helpers for driving a listener over scripted traffic

use async_trait::async_trait;
use courier_common::{ListenConfig, ListenResult};
use courier_core::{ActorId, Event};
use courier_stream::{
    EventStream, FrameSource, Listener, ListenerHandle, RawFrame, ResumePayload,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One scripted transport interaction
pub enum Step {
    /// Deliver a frame on a topic
    Frame(&'static str, serde_json::Value),
    /// A bounded read that elapsed without data
    Timeout,
    /// A transport failure
    Fail(courier_common::ListenError),
}

/// Scripted frame source: replays its steps in order, then reads as
/// repeated benign timeouts. Records every connect payload so tests can
/// assert on resume behavior.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    connects: Arc<Mutex<Vec<ResumePayload>>>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            connects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle onto the recorded connect payloads
    pub fn connects(&self) -> Arc<Mutex<Vec<ResumePayload>>> {
        Arc::clone(&self.connects)
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn connect(&mut self, resume: &ResumePayload) -> ListenResult<()> {
        self.connects.lock().push(resume.clone());
        Ok(())
    }

    async fn next_frame(&mut self, _timeout: Duration) -> ListenResult<Option<RawFrame>> {
        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Frame(topic, payload)) => Ok(Some(RawFrame::new(topic, payload))),
            Some(Step::Timeout) | None => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(None)
            }
            Some(Step::Fail(error)) => Err(error),
        }
    }

    async fn ping(&mut self) -> ListenResult<()> {
        Ok(())
    }

    async fn disconnect(&mut self) {}
}

/// Listener config suitable for tests: no cool-down sleeps
pub fn test_config() -> ListenConfig {
    ListenConfig {
        cooldown_secs: 0,
        ..ListenConfig::default()
    }
}

/// Start a listener over the scripted steps
pub fn start_scripted(steps: Vec<Step>) -> (ListenerHandle, EventStream) {
    let source = ScriptedSource::new(steps);
    Listener::new(source, test_config(), ActorId::new(999), 0).start()
}

/// Receive events until one matches `pred`, collecting everything seen
/// along the way. Panics if the stream ends first.
pub async fn recv_until(
    events: &mut EventStream,
    pred: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
    panic!("event stream ended before the expected event arrived");
}
