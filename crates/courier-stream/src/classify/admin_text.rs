//! Admin-text classification
//!
//! Admin-text deltas all share one `class` and discriminate further on a
//! nested `type` field: theme and nickname changes, admin grants, approval
//! mode, call logs, polls, and plans. The interesting payload lives in
//! `untypedData`, where every value is a string regardless of its real type.

use super::fields::{
    actor_field, cleared_str_field, flag_field, int_field, metadata_header, str_field,
};
use super::tags;
use crate::decode::DeltaRecord;
use courier_core::events::{
    AdminsAddedEvent, AdminsRemovedEvent, ApprovalModeSetEvent, CallEndedEvent, CallJoinedEvent,
    CallStartedEvent, ColorSetEvent, EmojiSetEvent, Event, NicknameSetEvent, PlanEvent,
    PlanRespondedEvent, PollCreatedEvent, PollVotedEvent, UnknownEvent,
};
use courier_core::{DomainError, EventHeader, EventTime, PlanInfo};
use serde_json::Value;

/// Build the event for an admin-text delta
pub(super) fn build(record: &DeltaRecord) -> Result<Option<Event>, DomainError> {
    let data = &record.data;
    let header = metadata_header(data)?;
    let untyped = data.get("untypedData").unwrap_or(&Value::Null);

    let event = match str_field(data, "type") {
        Some(tags::ADMIN_THEME) => Event::ColorSet(ColorSetEvent {
            header,
            color: cleared_str_field(untyped, "theme_color"),
        }),

        Some(tags::ADMIN_ICON) => Event::EmojiSet(EmojiSetEvent {
            header,
            emoji: cleared_str_field(untyped, "thread_icon"),
        }),

        Some(tags::ADMIN_NICKNAME) => Event::NicknameSet(NicknameSetEvent {
            header,
            subject: actor_field(untyped, "participant_id")?,
            nickname: cleared_str_field(untyped, "nickname"),
        }),

        Some(tags::ADMIN_ADMINS) => {
            let target = actor_field(untyped, "TARGET_ID")?;
            if str_field(untyped, "ADMIN_EVENT") == Some(tags::ADMIN_EVENT_ADD) {
                Event::AdminsAdded(AdminsAddedEvent {
                    header,
                    admins: vec![target],
                })
            } else {
                Event::AdminsRemoved(AdminsRemovedEvent {
                    header,
                    admins: vec![target],
                })
            }
        }

        Some(tags::ADMIN_APPROVAL_MODE) => {
            // Arrives as the strings "1"/"0"
            let require_approval = flag_field(untyped, "APPROVAL_MODE").ok_or_else(|| {
                DomainError::invalid_field("APPROVAL_MODE", "expected \"0\" or \"1\"")
            })?;
            Event::ApprovalModeSet(ApprovalModeSetEvent {
                header,
                require_approval,
            })
        }

        Some(tags::ADMIN_CALL_LOG) => build_call_log(header, untyped),

        Some(tags::ADMIN_CALL_JOINED) => {
            let mut header = header;
            if let Ok(joiner) = actor_field(untyped, "joining_user") {
                header.author = joiner;
            }
            Event::CallJoined(CallJoinedEvent { header })
        }

        Some(tags::ADMIN_POLL) => build_poll(header, untyped)?,

        Some(tags::ADMIN_PLAN_CREATED) => Event::PlanCreated(PlanEvent {
            header,
            plan: plan_info(untyped)?,
        }),
        Some(tags::ADMIN_PLAN_ENDED) => Event::PlanEnded(PlanEvent {
            header,
            plan: plan_info(untyped)?,
        }),
        Some(tags::ADMIN_PLAN_EDITED) => Event::PlanEdited(PlanEvent {
            header,
            plan: plan_info(untyped)?,
        }),
        Some(tags::ADMIN_PLAN_DELETED) => Event::PlanDeleted(PlanEvent {
            header,
            plan: plan_info(untyped)?,
        }),
        Some(tags::ADMIN_PLAN_RESPONDED) => Event::PlanResponded(PlanRespondedEvent {
            header,
            plan: plan_info(untyped)?,
            going: str_field(untyped, "guest_status") == Some(tags::GUEST_STATUS_GOING),
        }),

        _ => Event::Unknown(UnknownEvent {
            source: "admin-text".to_string(),
            data: data.clone(),
        }),
    };

    Ok(Some(event))
}

fn build_call_log(header: EventHeader, untyped: &Value) -> Event {
    let mut header = header;
    if let Ok(caller) = actor_field(untyped, "caller_id") {
        header.author = caller;
    }

    let event_name = str_field(untyped, "event").unwrap_or_default();
    if event_name.ends_with("started") {
        Event::CallStarted(CallStartedEvent { header })
    } else {
        Event::CallEnded(CallEndedEvent {
            header,
            duration_secs: int_field(untyped, "call_duration").unwrap_or(0),
        })
    }
}

fn build_poll(header: EventHeader, untyped: &Value) -> Result<Event, DomainError> {
    // The poll body is a JSON document encoded as a string field
    let question: Value = str_field(untyped, "question_json")
        .and_then(|s| serde_json::from_str(s).ok())
        .ok_or_else(|| DomainError::invalid_field("question_json", "missing or unparseable"))?;
    let title = str_field(&question, "text").unwrap_or_default().to_string();

    if str_field(untyped, "event_type") == Some(tags::POLL_EVENT_CREATED) {
        Ok(Event::PollCreated(PollCreatedEvent { header, title }))
    } else {
        Ok(Event::PollVoted(PollVotedEvent {
            header,
            title,
            added_options: id_list(untyped, "added_option_ids"),
            removed_options: id_list(untyped, "removed_option_ids"),
        }))
    }
}

/// Read a JSON-encoded id list field (`"[1,2]"`)
fn id_list(untyped: &Value, field: &str) -> Vec<i64> {
    str_field(untyped, field)
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn plan_info(untyped: &Value) -> Result<PlanInfo, DomainError> {
    Ok(PlanInfo {
        plan_id: str_field(untyped, "event_id")
            .ok_or(DomainError::MissingField("event_id"))?
            .to_string(),
        title: str_field(untyped, "event_title").unwrap_or_default().to_string(),
        scheduled_for: untyped.get("event_time").and_then(EventTime::seconds_from_json),
    })
}
