use crate::error::{AppError, AppResult};
use crate::models::message::{self, ConversationSummary, Message, NewMessage};
use crate::services::message_store::MessageStore;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process message store backing the test suite.
///
/// It enforces the same rules as the Postgres engine; the modification window in particular goes
/// through `message::check_modifiable`, so the business rule has exactly one
/// home.
#[derive(Default)]
pub struct MemoryMessageStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashSet<Uuid>,
    messages: Vec<Message>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user id the store should treat as existing.
    pub async fn add_user(&self, user_id: Uuid) {
        self.inner.lock().await.users.insert(user_id);
    }

    /// Test hook: shift a message's creation time into the past, as if the
    /// clock had advanced since it was sent.
    pub async fn age_message(&self, message_id: Uuid, by: Duration) {
        let mut inner = self.inner.lock().await;
        if let Some(m) = inner.messages.iter_mut().find(|m| m.id == message_id) {
            m.created_at = m.created_at - by;
        }
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn send(&self, new: NewMessage) -> AppResult<Message> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains(&new.sender_id) || !inner.users.contains(&new.receiver_id) {
            return Err(AppError::NotFound);
        }
        let msg = Message {
            id: Uuid::new_v4(),
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            content: new.content,
            attachment_url: new.attachment_url,
            is_read: false,
            read_at: None,
            is_edited: false,
            edited_at: None,
            created_at: Utc::now(),
        };
        inner.messages.push(msg.clone());
        Ok(msg)
    }

    async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Vec<Message>> {
        let inner = self.inner.lock().await;
        let mut out: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    async fn conversations_for(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let inner = self.inner.lock().await;
        let mut latest: HashMap<Uuid, Message> = HashMap::new();
        for m in inner
            .messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
        {
            let other = if m.sender_id == user_id {
                m.receiver_id
            } else {
                m.sender_id
            };
            match latest.get(&other) {
                Some(seen) if seen.created_at >= m.created_at => {}
                _ => {
                    latest.insert(other, m.clone());
                }
            }
        }
        let mut summaries: Vec<ConversationSummary> = latest
            .into_iter()
            .map(|(other_user_id, last_message)| ConversationSummary {
                other_user_id,
                last_message,
            })
            .collect();
        summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        Ok(summaries)
    }

    async fn unread_for(&self, user_id: Uuid) -> AppResult<Vec<Message>> {
        let inner = self.inner.lock().await;
        let mut out: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    async fn mark_read(&self, message_id: Uuid, reader_id: Uuid) -> AppResult<(Message, bool)> {
        let mut inner = self.inner.lock().await;
        let msg = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.receiver_id == reader_id)
            .ok_or(AppError::NotFound)?;
        if msg.is_read {
            return Ok((msg.clone(), false));
        }
        msg.is_read = true;
        msg.read_at = Some(Utc::now());
        Ok((msg.clone(), true))
    }

    async fn edit(&self, message_id: Uuid, editor_id: Uuid, content: String) -> AppResult<Message> {
        let mut inner = self.inner.lock().await;
        let msg = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(AppError::NotFound)?;
        message::check_modifiable(msg.sender_id, msg.created_at, editor_id, Utc::now())?;
        msg.content = content;
        msg.is_edited = true;
        msg.edited_at = Some(Utc::now());
        Ok(msg.clone())
    }

    async fn delete(&self, message_id: Uuid, requester_id: Uuid) -> AppResult<Message> {
        let mut inner = self.inner.lock().await;
        let idx = inner
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or(AppError::NotFound)?;
        message::check_modifiable(
            inner.messages[idx].sender_id,
            inner.messages[idx].created_at,
            requester_id,
            Utc::now(),
        )?;
        Ok(inner.messages.remove(idx))
    }
}
