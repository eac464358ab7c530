use crate::error::{AppError, AppResult};
use crate::models::message::{self, ConversationSummary, Message, NewMessage};
use crate::services::message_store::MessageStore;
use crate::services::user_service::UserService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

/// Postgres-backed message store.
///
/// Every guarded mutation (edit, delete, mark-read) is a single conditional
/// `UPDATE`/`DELETE` so the ownership-and-window check and the write cannot
/// interleave with a concurrent edit or delete of the same message.
#[derive(Clone)]
pub struct PgMessageStore {
    db: Pool<Postgres>,
}

impl PgMessageStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    fn from_row(r: &PgRow) -> Message {
        Message {
            id: r.get("id"),
            sender_id: r.get("sender_id"),
            receiver_id: r.get("receiver_id"),
            content: r.get("content"),
            attachment_url: r.get("attachment_url"),
            is_read: r.get("is_read"),
            read_at: r.get("read_at"),
            is_edited: r.get("is_edited"),
            edited_at: r.get("edited_at"),
            created_at: r.get("created_at"),
        }
    }

    /// Explain why a guarded edit/delete matched no row: the message is
    /// gone, the window lapsed, or the requester is not the sender.
    async fn modification_rejection(&self, message_id: Uuid, requester: Uuid) -> AppError {
        let row = sqlx::query("SELECT sender_id, created_at FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.db)
            .await;
        match row {
            Ok(Some(r)) => {
                let sender_id: Uuid = r.get("sender_id");
                let created_at: DateTime<Utc> = r.get("created_at");
                message::check_modifiable(sender_id, created_at, requester, Utc::now())
                    .err()
                    // the guard raced a concurrent writer; the row is gone
                    // or already rewritten, so report it as missing
                    .unwrap_or(AppError::NotFound)
            }
            Ok(None) => AppError::NotFound,
            Err(e) => AppError::Database(e),
        }
    }
}

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, attachment_url, \
                               is_read, read_at, is_edited, edited_at, created_at";

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn send(&self, new: NewMessage) -> AppResult<Message> {
        if !UserService::exists(&self.db, new.sender_id).await?
            || !UserService::exists(&self.db, new.receiver_id).await?
        {
            return Err(AppError::NotFound);
        }

        let row = sqlx::query(&format!(
            "INSERT INTO messages (id, sender_id, receiver_id, content, attachment_url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.sender_id)
        .bind(new.receiver_id)
        .bind(&new.content)
        .bind(&new.attachment_url)
        .fetch_one(&self.db)
        .await?;

        Ok(Self::from_row(&row))
    }

    async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE (sender_id = $1 AND receiver_id = $2) \
                OR (sender_id = $2 AND receiver_id = $1) \
             ORDER BY created_at ASC"
        ))
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(Self::from_row).collect())
    }

    async fn conversations_for(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        // One row per counterpart, keeping the newest message of each pair.
        let rows = sqlx::query(&format!(
            "SELECT DISTINCT ON (other_user_id) other_user_id, {MESSAGE_COLUMNS} \
             FROM ( \
                 SELECT m.*, \
                        CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END \
                            AS other_user_id \
                 FROM messages m \
                 WHERE m.sender_id = $1 OR m.receiver_id = $1 \
             ) pair \
             ORDER BY other_user_id, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut summaries: Vec<ConversationSummary> = rows
            .iter()
            .map(|r| ConversationSummary {
                other_user_id: r.get("other_user_id"),
                last_message: Self::from_row(r),
            })
            .collect();
        // newest conversation first for the inbox view
        summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        Ok(summaries)
    }

    async fn unread_for(&self, user_id: Uuid) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE receiver_id = $1 AND NOT is_read \
             ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(Self::from_row).collect())
    }

    async fn mark_read(&self, message_id: Uuid, reader_id: Uuid) -> AppResult<(Message, bool)> {
        let updated = sqlx::query(&format!(
            "UPDATE messages SET is_read = TRUE, read_at = NOW() \
             WHERE id = $1 AND receiver_id = $2 AND NOT is_read \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message_id)
        .bind(reader_id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = updated {
            return Ok((Self::from_row(&row), true));
        }

        // Already read (idempotent no-op), or not addressed to this reader.
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 AND receiver_id = $2"
        ))
        .bind(message_id)
        .bind(reader_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(r) => Ok((Self::from_row(&r), false)),
            None => Err(AppError::NotFound),
        }
    }

    async fn edit(&self, message_id: Uuid, editor_id: Uuid, content: String) -> AppResult<Message> {
        let updated = sqlx::query(&format!(
            "UPDATE messages SET content = $1, is_edited = TRUE, edited_at = NOW() \
             WHERE id = $2 AND sender_id = $3 \
               AND created_at > NOW() - make_interval(mins => $4) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(&content)
        .bind(message_id)
        .bind(editor_id)
        .bind(message::EDIT_DELETE_WINDOW_MINUTES as i32)
        .fetch_optional(&self.db)
        .await?;

        match updated {
            Some(row) => Ok(Self::from_row(&row)),
            None => Err(self.modification_rejection(message_id, editor_id).await),
        }
    }

    async fn delete(&self, message_id: Uuid, requester_id: Uuid) -> AppResult<Message> {
        let deleted = sqlx::query(&format!(
            "DELETE FROM messages \
             WHERE id = $1 AND sender_id = $2 \
               AND created_at > NOW() - make_interval(mins => $3) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message_id)
        .bind(requester_id)
        .bind(message::EDIT_DELETE_WINDOW_MINUTES as i32)
        .fetch_optional(&self.db)
        .await?;

        match deleted {
            Some(row) => Ok(Self::from_row(&row)),
            None => Err(self.modification_rejection(message_id, requester_id).await),
        }
    }
}
