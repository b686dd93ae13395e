//! Event classifier
//!
//! An ordered decision table: each rule pairs a predicate over the record's
//! discriminator fields with a constructor for the matching event. Rules are
//! tried in priority order and the first match wins. A record no rule
//! recognizes becomes `Unknown` - classification never fails outright -
//! while a handful of bookkeeping tags produce no event at all.

use super::fields::{
    actor_field, cleared_str_field, flag_field, int_field, metadata_header, millis_or_error,
    str_field,
};
use super::{admin_text, tags};
use crate::decode::DeltaRecord;
use chrono::Utc;
use courier_core::events::{
    Event, EventHeader, FriendRequestEvent, InboxCounts, InboxEvent, LiveLocationEvent,
    MessageEvent, MessageUnsentEvent, MessagesDeliveredEvent, ParticipantsAddedEvent,
    ParticipantsRemovedEvent, PresenceEvent, PresenceStatus, ReactionAction, ReactionEvent,
    ThreadsReadEvent, TitleSetEvent, TypingEvent, UnfetchedThreadEvent, UnknownEvent,
};
use courier_core::{ActorId, DomainError, EventTime, ThreadRef};
use serde_json::Value;

type BuildFn = fn(&DeltaRecord) -> Result<Option<Event>, DomainError>;

/// One (predicate, constructor) pair of the decision table
struct Rule {
    name: &'static str,
    applies: fn(&DeltaRecord) -> bool,
    build: BuildFn,
}

/// The decision table, in priority order. First match wins.
static RULES: &[Rule] = &[
    Rule {
        name: "participants-added",
        applies: |r| r.data.get("addedParticipants").is_some(),
        build: build_participants_added,
    },
    Rule {
        name: "participant-left",
        applies: |r| r.data.get("leftParticipantFbId").is_some(),
        build: build_participant_left,
    },
    Rule {
        name: "admin-text",
        applies: |r| r.class() == Some(tags::CLASS_ADMIN_TEXT),
        build: admin_text::build,
    },
    Rule {
        name: "thread-name",
        applies: |r| r.class() == Some(tags::CLASS_THREAD_NAME),
        build: build_thread_name,
    },
    Rule {
        name: "forced-fetch",
        applies: |r| r.class() == Some(tags::CLASS_FORCED_FETCH),
        build: build_forced_fetch,
    },
    Rule {
        name: "delivery-receipt",
        applies: |r| r.class() == Some(tags::CLASS_DELIVERY_RECEIPT),
        build: build_delivery_receipt,
    },
    Rule {
        name: "read-receipt",
        applies: |r| r.class() == Some(tags::CLASS_READ_RECEIPT),
        build: build_read_receipt,
    },
    Rule {
        name: "mark-read",
        applies: |r| r.class() == Some(tags::CLASS_MARK_READ),
        build: build_mark_read,
    },
    Rule {
        name: "bookkeeping",
        applies: |r| {
            matches!(
                r.class(),
                Some(tags::CLASS_NO_OP | tags::CLASS_MARK_FOLDER_SEEN)
            )
        },
        build: |_| Ok(None),
    },
    Rule {
        name: "new-message",
        applies: |r| r.class() == Some(tags::CLASS_NEW_MESSAGE),
        build: build_new_message,
    },
    Rule {
        name: "reaction",
        applies: |r| r.data.get(tags::KEY_REACTION).is_some(),
        build: build_reaction,
    },
    Rule {
        name: "viewer-status",
        applies: |r| r.data.get(tags::KEY_VIEWER_STATUS).is_some(),
        build: build_viewer_status,
    },
    Rule {
        name: "message-unsend",
        applies: |r| r.data.get(tags::KEY_UNSEND).is_some(),
        build: build_unsend,
    },
    Rule {
        name: "message-reply",
        applies: |r| r.data.get(tags::KEY_REPLY).is_some(),
        build: build_reply,
    },
    Rule {
        name: "live-location",
        applies: |r| r.data.get(tags::KEY_LIVE_LOCATION).is_some(),
        build: build_live_location,
    },
    Rule {
        name: "typing",
        applies: |r| {
            matches!(
                r.tag.as_deref(),
                Some(tags::ENV_TYPING | tags::ENV_TYPING_TAB)
            )
        },
        build: build_typing,
    },
    Rule {
        name: "inbox",
        applies: |r| r.tag.as_deref() == Some(tags::ENV_INBOX),
        build: build_inbox,
    },
    Rule {
        name: "presence-proxy",
        applies: |r| r.tag.as_deref() == Some(tags::ENV_PROXY_PRESENCE),
        build: build_presence_proxy,
    },
    Rule {
        name: "presence-overlay",
        applies: |r| r.tag.as_deref() == Some(tags::ENV_BUDDYLIST_OVERLAY),
        build: build_presence_overlay,
    },
    Rule {
        name: "friend-request",
        applies: |r| r.tag.as_deref() == Some(tags::ENV_FRIEND_REQUEST),
        build: build_friend_request,
    },
    Rule {
        name: "qprimer",
        applies: |r| r.tag.as_deref() == Some(tags::ENV_QPRIMER),
        build: |_| Ok(None),
    },
];

/// Classify one record into at most one event.
///
/// `Ok(None)` filters bookkeeping records. A record no rule matches yields
/// `Unknown` rather than an error; errors are reserved for records a rule
/// claimed but could not extract the required fields from, and are scoped
/// to that single record.
pub fn classify(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    for rule in RULES {
        if (rule.applies)(record) {
            return (rule.build)(record);
        }
    }

    Ok(Some(Event::Unknown(UnknownEvent {
        source: record.source_label(),
        data: record.data.clone(),
    })))
}

/// Rule names, in evaluation order
#[must_use]
pub fn rule_names() -> Vec<&'static str> {
    RULES.iter().map(|r| r.name).collect()
}

// ============================================================================
// Rule constructors
// ============================================================================

fn build_participants_added(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let header = metadata_header(&record.data)?;
    let list = record
        .data
        .get("addedParticipants")
        .and_then(Value::as_array)
        .ok_or_else(|| DomainError::invalid_field("addedParticipants", "not an array"))?;

    let mut added = Vec::with_capacity(list.len());
    for participant in list {
        added.push(actor_field(participant, "userFbId")?);
    }

    Ok(Some(Event::ParticipantsAdded(ParticipantsAddedEvent {
        header,
        added,
    })))
}

fn build_participant_left(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let header = metadata_header(&record.data)?;
    let removed = actor_field(&record.data, "leftParticipantFbId")?;

    Ok(Some(Event::ParticipantsRemoved(ParticipantsRemovedEvent {
        header,
        removed,
    })))
}

fn build_thread_name(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let header = metadata_header(&record.data)?;
    Ok(Some(Event::TitleSet(TitleSetEvent {
        header,
        title: cleared_str_field(&record.data, "name"),
    })))
}

fn build_forced_fetch(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let thread = ThreadRef::from_record(&record.data)?;
    Ok(Some(Event::UnfetchedThread(UnfetchedThreadEvent {
        thread,
        message_id: str_field(&record.data, "messageId").map(str::to_string),
    })))
}

fn build_delivery_receipt(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let author = actor_field(&record.data, "actorFbId")?;
    let thread = ThreadRef::from_record(&record.data)?;
    let at = millis_or_error(&record.data, "deliveredWatermarkTimestampMs")?;

    let message_ids = record
        .data
        .get("messageIds")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(Event::MessagesDelivered(MessagesDeliveredEvent {
        header: EventHeader::new(author, thread, at),
        message_ids,
    })))
}

fn build_read_receipt(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let reader = actor_field(&record.data, "actorFbId")?;
    let thread = ThreadRef::from_record(&record.data)?;
    let at = millis_or_error(&record.data, "actionTimestampMs")?;

    Ok(Some(Event::ThreadsRead(ThreadsReadEvent {
        reader: Some(reader),
        threads: vec![thread],
        at,
    })))
}

fn build_mark_read(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let keys = record
        .data
        .get("threadKeys")
        .and_then(Value::as_array)
        .ok_or(DomainError::MissingThreadKey)?;

    let threads: Vec<ThreadRef> = keys
        .iter()
        .filter_map(|key| ThreadRef::from_thread_key(key).ok())
        .collect();
    if threads.is_empty() {
        return Err(DomainError::MissingThreadKey);
    }

    // The viewer read these; the wire names no actor. Timestamp spelling
    // varies between two field names.
    let at = record
        .data
        .get("actionTimestampMs")
        .and_then(EventTime::millis_from_json)
        .or_else(|| {
            record
                .data
                .get("actionTimestamp")
                .and_then(EventTime::millis_from_json)
        })
        .unwrap_or_else(Utc::now);

    Ok(Some(Event::ThreadsRead(ThreadsReadEvent {
        reader: None,
        threads,
        at,
    })))
}

fn build_new_message(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let header = metadata_header(&record.data)?;
    let message_id = record
        .data
        .pointer("/messageMetadata/messageId")
        .and_then(Value::as_str)
        .ok_or(DomainError::MissingField("messageId"))?
        .to_string();

    Ok(Some(Event::Message(MessageEvent {
        header,
        message_id,
        text: cleared_str_field(&record.data, "body"),
        reply_to: None,
    })))
}

fn build_reaction(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let delta = record
        .data
        .get(tags::KEY_REACTION)
        .ok_or(DomainError::MissingField(tags::KEY_REACTION))?;

    let thread = ThreadRef::from_record(delta)?;
    let author = actor_field(delta, "userId").or_else(|_| actor_field(delta, "senderId"))?;
    let message_id = str_field(delta, "messageId")
        .ok_or(DomainError::MissingField("messageId"))?
        .to_string();

    // 0 adds the reaction; any nonzero value removes it
    let action = match int_field(delta, "action") {
        Some(0) => ReactionAction::Added,
        Some(_) => ReactionAction::Removed,
        None => return Err(DomainError::invalid_field("action", "missing or not a number")),
    };

    Ok(Some(Event::Reaction(ReactionEvent {
        header: EventHeader::new(author, thread, Utc::now()),
        message_id,
        reaction: cleared_str_field(delta, "reaction"),
        action,
    })))
}

fn build_viewer_status(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let delta = record
        .data
        .get(tags::KEY_VIEWER_STATUS)
        .ok_or(DomainError::MissingField(tags::KEY_VIEWER_STATUS))?;
    let thread = ThreadRef::from_record(delta)?;

    let reader = actor_field(delta, "actorFbid")
        .or_else(|_| actor_field(delta, "actorFbId"))
        .ok();

    Ok(Some(Event::ThreadsRead(ThreadsReadEvent {
        reader,
        threads: vec![thread],
        at: Utc::now(),
    })))
}

fn build_unsend(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let delta = record
        .data
        .get(tags::KEY_UNSEND)
        .ok_or(DomainError::MissingField(tags::KEY_UNSEND))?;

    let thread = ThreadRef::from_record(delta)?;
    let author = actor_field(delta, "senderID").or_else(|_| actor_field(delta, "senderId"))?;
    let message_id = str_field(delta, "messageID")
        .or_else(|| str_field(delta, "messageId"))
        .ok_or(DomainError::MissingField("messageID"))?
        .to_string();
    let at = delta
        .get("deletionTimestamp")
        .and_then(EventTime::millis_from_json)
        .unwrap_or_else(Utc::now);

    Ok(Some(Event::MessageUnsent(MessageUnsentEvent {
        header: EventHeader::new(author, thread, at),
        message_id,
    })))
}

fn build_reply(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let delta = record
        .data
        .get(tags::KEY_REPLY)
        .ok_or(DomainError::MissingField(tags::KEY_REPLY))?;
    let message = delta
        .get("message")
        .ok_or(DomainError::MissingField("message"))?;

    let header = metadata_header(message)?;
    let message_id = message
        .pointer("/messageMetadata/messageId")
        .and_then(Value::as_str)
        .ok_or(DomainError::MissingField("messageId"))?
        .to_string();
    let reply_to = delta
        .pointer("/repliedToMessage/messageMetadata/messageId")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Some(Event::Message(MessageEvent {
        header,
        message_id,
        text: cleared_str_field(message, "body"),
        reply_to,
    })))
}

fn build_live_location(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let delta = record
        .data
        .get(tags::KEY_LIVE_LOCATION)
        .ok_or(DomainError::MissingField(tags::KEY_LIVE_LOCATION))?;

    let thread = ThreadRef::from_record(delta)?;
    let author = actor_field(delta, "senderId").or_else(|_| actor_field(delta, "senderID"))?;
    let message_id = str_field(delta, "messageId")
        .or_else(|| str_field(delta, "messageID"))
        .ok_or(DomainError::MissingField("messageId"))?
        .to_string();

    Ok(Some(Event::LiveLocation(LiveLocationEvent {
        header: EventHeader::new(author, thread, Utc::now()),
        message_id,
        latitude: delta.pointer("/coordinate/latitude").and_then(Value::as_f64),
        longitude: delta.pointer("/coordinate/longitude").and_then(Value::as_f64),
    })))
}

fn build_typing(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let author = actor_field(&record.data, "from")?;

    // A group carries its own id; otherwise the conversation is 1:1 with
    // the sender.
    let thread = match int_field(&record.data, "thread_fbid") {
        Some(id) => ThreadRef::Group(id),
        None => ThreadRef::User(author.into_inner()),
    };

    // Arrives as 0/1, sometimes spelled as a string
    let typing = flag_field(&record.data, "st")
        .ok_or_else(|| DomainError::invalid_field("st", "expected 0 or 1"))?;

    Ok(Some(Event::Typing(TypingEvent {
        header: EventHeader::new(author, thread, Utc::now()),
        typing,
    })))
}

fn build_inbox(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let counts = InboxCounts {
        unseen: int_field(&record.data, "unseen").unwrap_or(0),
        unread: int_field(&record.data, "unread").unwrap_or(0),
        recent_unread: int_field(&record.data, "recent_unread").unwrap_or(0),
    };

    Ok(Some(Event::Inbox(InboxEvent {
        counts,
        at: Utc::now(),
    })))
}

fn build_presence_proxy(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    build_presence(&record.data, "buddyList", "p", "lat")
}

fn build_presence_overlay(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    build_presence(&record.data, "overlay", "a", "la")
}

/// The two presence envelopes differ only in field spellings: the map key,
/// the active flag, and the last-active seconds field.
fn build_presence(
    data: &Value,
    map_field: &'static str,
    active_field: &str,
    last_active_field: &str,
) -> Result<Option<Event>, DomainError> {
    let map = data
        .get(map_field)
        .and_then(Value::as_object)
        .ok_or(DomainError::MissingField(map_field))?;

    let mut statuses = Vec::with_capacity(map.len());
    for (uid, info) in map {
        let Ok(user) = ActorId::parse(uid) else {
            continue;
        };
        statuses.push(PresenceStatus {
            user,
            active: int_field(info, active_field).map_or(false, |a| a != 0),
            last_active: info.get(last_active_field).and_then(EventTime::seconds_from_json),
        });
    }

    Ok(Some(Event::Presence(PresenceEvent {
        statuses,
        at: Utc::now(),
    })))
}

fn build_friend_request(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let from = actor_field(&record.data, "from")?;
    Ok(Some(Event::FriendRequest(FriendRequestEvent { from })))
}
