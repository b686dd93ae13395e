//! Listener state machine
//!
//! `Idle -> Connecting -> Listening -> Stopped`, with `Stopped` terminal.
//! The state is shared between the read loop and the caller's handle, so it
//! lives in an atomic cell.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ListenerState {
    /// Constructed, not yet started
    Idle = 0,
    /// Establishing (or re-establishing) the transport
    Connecting = 1,
    /// Reading frames
    Listening = 2,
    /// Loop ended; terminal
    Stopped = 3,
}

impl ListenerState {
    /// Whether this state can never be left
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Listening,
            3 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Listening => "listening",
            Self::Stopped => "stopped",
        };
        write!(f, "{name}")
    }
}

/// Atomic cell holding a `ListenerState`
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ListenerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ListenerState {
        ListenerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Store `state`, unless the cell is already terminal
    pub fn store(&self, state: ListenerState) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if ListenerState::from_u8(current).is_terminal() {
                    None
                } else {
                    Some(state as u8)
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let cell = StateCell::new(ListenerState::Idle);
        assert_eq!(cell.load(), ListenerState::Idle);

        cell.store(ListenerState::Connecting);
        assert_eq!(cell.load(), ListenerState::Connecting);

        cell.store(ListenerState::Listening);
        assert_eq!(cell.load(), ListenerState::Listening);
    }

    #[test]
    fn test_stopped_is_terminal() {
        let cell = StateCell::new(ListenerState::Listening);
        cell.store(ListenerState::Stopped);
        cell.store(ListenerState::Listening);
        assert_eq!(cell.load(), ListenerState::Stopped);
    }

    #[test]
    fn test_display() {
        assert_eq!(ListenerState::Listening.to_string(), "listening");
        assert_eq!(ListenerState::Stopped.to_string(), "stopped");
    }
}
