//! Stream events - the typed output of the ingestion pipeline
//!
//! Every delta the remote service delivers classifies into exactly one of
//! these variants (or `Unknown`). Thread-scoped variants embed a common
//! `EventHeader`; connection-level variants carry their own fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{ActorId, ThreadRef};

/// Common header shared by thread-scoped events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Who performed the action
    pub author: ActorId,
    /// The conversation the action happened in
    pub thread: ThreadRef,
    /// When it happened, normalized to absolute time
    pub at: DateTime<Utc>,
}

impl EventHeader {
    pub fn new(author: ActorId, thread: ThreadRef, at: DateTime<Utc>) -> Self {
        Self { author, thread, at }
    }
}

/// All events the pipeline can produce
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    // =========================================================================
    // Message Events
    // =========================================================================
    Message(MessageEvent),
    MessageUnsent(MessageUnsentEvent),
    Reaction(ReactionEvent),
    MessagesDelivered(MessagesDeliveredEvent),
    ThreadsRead(ThreadsReadEvent),
    LiveLocation(LiveLocationEvent),

    // =========================================================================
    // Thread Settings Events
    // =========================================================================
    ParticipantsAdded(ParticipantsAddedEvent),
    ParticipantsRemoved(ParticipantsRemovedEvent),
    TitleSet(TitleSetEvent),
    ColorSet(ColorSetEvent),
    EmojiSet(EmojiSetEvent),
    NicknameSet(NicknameSetEvent),
    AdminsAdded(AdminsAddedEvent),
    AdminsRemoved(AdminsRemovedEvent),
    ApprovalModeSet(ApprovalModeSetEvent),

    // =========================================================================
    // Call Events
    // =========================================================================
    CallStarted(CallStartedEvent),
    CallEnded(CallEndedEvent),
    CallJoined(CallJoinedEvent),

    // =========================================================================
    // Poll / Plan Events
    // =========================================================================
    PollCreated(PollCreatedEvent),
    PollVoted(PollVotedEvent),
    PlanCreated(PlanEvent),
    PlanEnded(PlanEvent),
    PlanEdited(PlanEvent),
    PlanDeleted(PlanEvent),
    PlanResponded(PlanRespondedEvent),

    // =========================================================================
    // Activity Events
    // =========================================================================
    Typing(TypingEvent),
    Presence(PresenceEvent),
    Inbox(InboxEvent),
    FriendRequest(FriendRequestEvent),
    UnfetchedThread(UnfetchedThreadEvent),

    // =========================================================================
    // Connection Events
    // =========================================================================
    Connected(ConnectedEvent),
    Disconnected(DisconnectedEvent),

    /// A delta no classification rule recognized. Carries the raw record so
    /// callers can inspect protocol changes without the listener crashing.
    Unknown(UnknownEvent),
}

impl Event {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Message(_) => "MESSAGE",
            Self::MessageUnsent(_) => "MESSAGE_UNSENT",
            Self::Reaction(_) => "REACTION",
            Self::MessagesDelivered(_) => "MESSAGES_DELIVERED",
            Self::ThreadsRead(_) => "THREADS_READ",
            Self::LiveLocation(_) => "LIVE_LOCATION",
            Self::ParticipantsAdded(_) => "PARTICIPANTS_ADDED",
            Self::ParticipantsRemoved(_) => "PARTICIPANTS_REMOVED",
            Self::TitleSet(_) => "TITLE_SET",
            Self::ColorSet(_) => "COLOR_SET",
            Self::EmojiSet(_) => "EMOJI_SET",
            Self::NicknameSet(_) => "NICKNAME_SET",
            Self::AdminsAdded(_) => "ADMINS_ADDED",
            Self::AdminsRemoved(_) => "ADMINS_REMOVED",
            Self::ApprovalModeSet(_) => "APPROVAL_MODE_SET",
            Self::CallStarted(_) => "CALL_STARTED",
            Self::CallEnded(_) => "CALL_ENDED",
            Self::CallJoined(_) => "CALL_JOINED",
            Self::PollCreated(_) => "POLL_CREATED",
            Self::PollVoted(_) => "POLL_VOTED",
            Self::PlanCreated(_) => "PLAN_CREATED",
            Self::PlanEnded(_) => "PLAN_ENDED",
            Self::PlanEdited(_) => "PLAN_EDITED",
            Self::PlanDeleted(_) => "PLAN_DELETED",
            Self::PlanResponded(_) => "PLAN_RESPONDED",
            Self::Typing(_) => "TYPING",
            Self::Presence(_) => "PRESENCE",
            Self::Inbox(_) => "INBOX",
            Self::FriendRequest(_) => "FRIEND_REQUEST",
            Self::UnfetchedThread(_) => "UNFETCHED_THREAD",
            Self::Connected(_) => "CONNECTED",
            Self::Disconnected(_) => "DISCONNECTED",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Get the common header, for variants that have one
    pub fn header(&self) -> Option<&EventHeader> {
        match self {
            Self::Message(e) => Some(&e.header),
            Self::MessageUnsent(e) => Some(&e.header),
            Self::Reaction(e) => Some(&e.header),
            Self::MessagesDelivered(e) => Some(&e.header),
            Self::LiveLocation(e) => Some(&e.header),
            Self::ParticipantsAdded(e) => Some(&e.header),
            Self::ParticipantsRemoved(e) => Some(&e.header),
            Self::TitleSet(e) => Some(&e.header),
            Self::ColorSet(e) => Some(&e.header),
            Self::EmojiSet(e) => Some(&e.header),
            Self::NicknameSet(e) => Some(&e.header),
            Self::AdminsAdded(e) => Some(&e.header),
            Self::AdminsRemoved(e) => Some(&e.header),
            Self::ApprovalModeSet(e) => Some(&e.header),
            Self::CallStarted(e) => Some(&e.header),
            Self::CallEnded(e) => Some(&e.header),
            Self::CallJoined(e) => Some(&e.header),
            Self::PollCreated(e) => Some(&e.header),
            Self::PollVoted(e) => Some(&e.header),
            Self::PlanCreated(e) | Self::PlanEnded(e) | Self::PlanEdited(e) | Self::PlanDeleted(e) => {
                Some(&e.header)
            }
            Self::PlanResponded(e) => Some(&e.header),
            Self::Typing(e) => Some(&e.header),
            _ => None,
        }
    }

    /// The conversation this event belongs to, if it is thread-scoped
    pub fn thread(&self) -> Option<ThreadRef> {
        if let Some(header) = self.header() {
            return Some(header.thread);
        }
        match self {
            Self::UnfetchedThread(e) => Some(e.thread),
            _ => None,
        }
    }
}

// ============================================================================
// Event Structs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub header: EventHeader,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set when this message is a reply to an earlier one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageUnsentEvent {
    pub header: EventHeader,
    pub message_id: String,
}

/// Whether a reaction change added or removed the reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    /// Author is the user whose reaction changed
    pub header: EventHeader,
    pub message_id: String,
    /// Absent on removal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    pub action: ReactionAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesDeliveredEvent {
    /// Author is the recipient the messages were delivered to
    pub header: EventHeader,
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsReadEvent {
    /// The user whose read state advanced; `None` means the authenticated
    /// viewer (the wire omits the actor on self-reads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader: Option<ActorId>,
    pub threads: Vec<ThreadRef>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveLocationEvent {
    pub header: EventHeader,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantsAddedEvent {
    pub header: EventHeader,
    pub added: Vec<ActorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantsRemovedEvent {
    pub header: EventHeader,
    /// The wire delivers removals one participant at a time
    pub removed: ActorId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleSetEvent {
    pub header: EventHeader,
    /// `None` means the title was cleared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorSetEvent {
    pub header: EventHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmojiSetEvent {
    pub header: EventHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NicknameSetEvent {
    pub header: EventHeader,
    /// The participant whose nickname changed
    pub subject: ActorId,
    /// `None` means the nickname was cleared (the wire sends an empty string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminsAddedEvent {
    pub header: EventHeader,
    pub admins: Vec<ActorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminsRemovedEvent {
    pub header: EventHeader,
    pub admins: Vec<ActorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalModeSetEvent {
    pub header: EventHeader,
    pub require_approval: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStartedEvent {
    /// Author is the caller
    pub header: EventHeader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEndedEvent {
    pub header: EventHeader,
    pub duration_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallJoinedEvent {
    /// Author is the participant who joined
    pub header: EventHeader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollCreatedEvent {
    pub header: EventHeader,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollVotedEvent {
    pub header: EventHeader,
    pub title: String,
    /// Option ids the voter added
    pub added_options: Vec<i64>,
    /// Option ids the voter retracted
    pub removed_options: Vec<i64>,
}

/// Shared fields of an event plan (reminder)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInfo {
    pub plan_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEvent {
    pub header: EventHeader,
    pub plan: PlanInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRespondedEvent {
    /// Author is the responding guest
    pub header: EventHeader,
    pub plan: PlanInfo,
    pub going: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingEvent {
    pub header: EventHeader,
    pub typing: bool,
}

/// One user's presence snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceStatus {
    pub user: ActorId,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub statuses: Vec<PresenceStatus>,
    pub at: DateTime<Utc>,
}

/// Unseen/unread counters from an inbox envelope
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InboxCounts {
    pub unseen: i64,
    pub unread: i64,
    pub recent_unread: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEvent {
    pub counts: InboxCounts,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestEvent {
    pub from: ActorId,
}

/// A change happened in a thread but the delta carries no body; the caller
/// must fetch the thread to see what changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnfetchedThreadEvent {
    pub thread: ThreadRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedEvent {
    pub session_id: u64,
}

/// Why the listen loop ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisconnectReason {
    /// `stop()` was called
    Requested,
    /// An unrecoverable error terminated the loop
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectedEvent {
    pub reason: DisconnectReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnknownEvent {
    /// Which tier/discriminator produced the record
    pub source: String,
    /// The raw record, untouched
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn header() -> EventHeader {
        EventHeader::new(
            ActorId::new(1),
            ThreadRef::Group(2),
            Utc.timestamp_millis_opt(1_600_000_000_000).unwrap(),
        )
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::Message(MessageEvent {
            header: header(),
            message_id: "mid.123".to_string(),
            text: Some("hello".to_string()),
            reply_to: None,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("MESSAGE"));
        assert!(json.contains("mid.123"));
        assert!(!json.contains("reply_to"));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), "MESSAGE");
    }

    #[test]
    fn test_event_type() {
        let event = Event::FriendRequest(FriendRequestEvent {
            from: ActorId::new(3),
        });
        assert_eq!(event.event_type(), "FRIEND_REQUEST");
    }

    #[test]
    fn test_header_accessor() {
        let event = Event::Reaction(ReactionEvent {
            header: header(),
            message_id: "mid.1".to_string(),
            reaction: Some("\u{2764}".to_string()),
            action: ReactionAction::Added,
        });
        assert_eq!(event.header().unwrap().author, ActorId::new(1));
        assert_eq!(event.thread(), Some(ThreadRef::Group(2)));

        let event = Event::Presence(PresenceEvent {
            statuses: vec![],
            at: Utc::now(),
        });
        assert!(event.header().is_none());
        assert!(event.thread().is_none());
    }

    #[test]
    fn test_unfetched_thread_has_thread_without_header() {
        let event = Event::UnfetchedThread(UnfetchedThreadEvent {
            thread: ThreadRef::User(9),
            message_id: None,
        });
        assert!(event.header().is_none());
        assert_eq!(event.thread(), Some(ThreadRef::User(9)));
    }

    #[test]
    fn test_unknown_preserves_data() {
        let data = serde_json::json!({"class": "SomethingNew", "x": 1});
        let event = Event::Unknown(UnknownEvent {
            source: "sync".to_string(),
            data: data.clone(),
        });
        match event {
            Event::Unknown(e) => assert_eq!(e.data, data),
            _ => unreachable!(),
        }
    }
}
