//! Stream events - typed events produced by the ingestion pipeline

mod stream_event;

pub use stream_event::{
    AdminsAddedEvent, AdminsRemovedEvent, ApprovalModeSetEvent, CallEndedEvent, CallJoinedEvent,
    CallStartedEvent, ColorSetEvent, ConnectedEvent, DisconnectReason, DisconnectedEvent,
    EmojiSetEvent, Event, EventHeader, FriendRequestEvent, InboxCounts, InboxEvent,
    LiveLocationEvent, MessageEvent, MessageUnsentEvent, MessagesDeliveredEvent, NicknameSetEvent,
    ParticipantsAddedEvent, ParticipantsRemovedEvent, PlanEvent, PlanInfo, PlanRespondedEvent,
    PollCreatedEvent, PollVotedEvent, PresenceEvent, PresenceStatus, ReactionAction,
    ReactionEvent, ThreadsReadEvent, TitleSetEvent, TypingEvent, UnfetchedThreadEvent,
    UnknownEvent,
};
