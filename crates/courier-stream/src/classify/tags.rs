//! Wire discriminator strings
//!
//! The central table of every tag the pipeline matches against. These are
//! wire-compatibility constants; their spelling is dictated by the upstream
//! protocol.

// =============================================================================
// Sync-queue delta classes
// =============================================================================

pub const CLASS_NEW_MESSAGE: &str = "NewMessage";
pub const CLASS_CLIENT_PAYLOAD: &str = "ClientPayload";
pub const CLASS_ADMIN_TEXT: &str = "AdminTextMessage";
pub const CLASS_THREAD_NAME: &str = "ThreadName";
pub const CLASS_FORCED_FETCH: &str = "ForcedFetch";
pub const CLASS_DELIVERY_RECEIPT: &str = "DeliveryReceipt";
pub const CLASS_READ_RECEIPT: &str = "ReadReceipt";
pub const CLASS_MARK_READ: &str = "MarkRead";
pub const CLASS_NO_OP: &str = "NoOp";
pub const CLASS_MARK_FOLDER_SEEN: &str = "MarkFolderSeen";

// =============================================================================
// Envelope types
// =============================================================================

pub const ENV_DELTA: &str = "delta";
pub const ENV_INBOX: &str = "inbox";
pub const ENV_TYPING: &str = "typ";
pub const ENV_TYPING_TAB: &str = "ttyp";
pub const ENV_QPRIMER: &str = "qprimer";
pub const ENV_PROXY_PRESENCE: &str = "chatproxy-presence";
pub const ENV_BUDDYLIST_OVERLAY: &str = "buddylist_overlay";
pub const ENV_FRIEND_REQUEST: &str = "jewel_requests_add";

// =============================================================================
// Client-payload tier discriminator keys
// =============================================================================

pub const KEY_REACTION: &str = "deltaMessageReaction";
pub const KEY_VIEWER_STATUS: &str = "deltaChangeViewerStatus";
pub const KEY_UNSEND: &str = "deltaRecallMessageData";
pub const KEY_REPLY: &str = "deltaMessageReply";
pub const KEY_LIVE_LOCATION: &str = "liveLocationData";

// =============================================================================
// Admin-text subtypes
// =============================================================================

pub const ADMIN_THEME: &str = "change_thread_theme";
pub const ADMIN_ICON: &str = "change_thread_icon";
pub const ADMIN_NICKNAME: &str = "change_thread_nickname";
pub const ADMIN_ADMINS: &str = "change_thread_admins";
pub const ADMIN_APPROVAL_MODE: &str = "change_thread_approval_mode";
pub const ADMIN_CALL_LOG: &str = "messenger_call_log";
pub const ADMIN_CALL_JOINED: &str = "participant_joined_group_call";
pub const ADMIN_POLL: &str = "group_poll";
pub const ADMIN_PLAN_CREATED: &str = "plan_creation";
pub const ADMIN_PLAN_ENDED: &str = "plan_ended";
pub const ADMIN_PLAN_EDITED: &str = "plan_edited";
pub const ADMIN_PLAN_DELETED: &str = "plan_deletion";
pub const ADMIN_PLAN_RESPONDED: &str = "plan_user_settings";

/// Admin-event value that adds admins (anything else removes)
pub const ADMIN_EVENT_ADD: &str = "add_admin";

/// Poll event value for creation (the other observed value is a vote update)
pub const POLL_EVENT_CREATED: &str = "question_creation";

/// Guest status value meaning the responder is going
pub const GUEST_STATUS_GOING: &str = "GOING";
