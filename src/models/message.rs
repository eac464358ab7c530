use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minutes after creation during which the sender may still edit or delete
/// a message. A business rule, not configuration.
pub const EDIT_DELETE_WINDOW_MINUTES: i64 = 15;

/// A direct message between two users. Participants are fixed at creation;
/// only `content` (via edit) and the read state ever change afterwards.
/// Serialized in the camelCase shape the web client consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub attachment_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn participants(&self) -> [Uuid; 2] {
        [self.sender_id, self.receiver_id]
    }
}

/// Input for a send operation, before the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub attachment_url: Option<String>,
}

/// Inbox row: one counterpart and the latest message exchanged with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub other_user_id: Uuid,
    pub last_message: Message,
}

/// Whether `requester` may edit or delete a message right now.
///
/// The expiry check runs first: once the window has lapsed, every attempt is
/// rejected as expired regardless of who asks. The same rule backs the
/// guarded SQL in the Postgres store; when the guarded statement matches no
/// row, the follow-up read goes through here to pick the precise rejection.
pub fn check_modifiable(
    sender_id: Uuid,
    created_at: DateTime<Utc>,
    requester: Uuid,
    now: DateTime<Utc>,
) -> Result<(), crate::error::AppError> {
    if now - created_at >= Duration::minutes(EDIT_DELETE_WINDOW_MINUTES) {
        return Err(crate::error::AppError::WindowExpired {
            created_at,
            window_minutes: EDIT_DELETE_WINDOW_MINUTES,
        });
    }
    if requester != sender_id {
        return Err(crate::error::AppError::Forbidden);
    }
    Ok(())
}
