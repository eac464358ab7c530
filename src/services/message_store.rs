use crate::error::AppResult;
use crate::models::message::{ConversationSummary, Message, NewMessage};
use async_trait::async_trait;
use uuid::Uuid;

/// The single repository interface for messages. Postgres backs it in
/// production (`PgMessageStore`); `MemoryMessageStore` backs the tests.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message. Fails with `NotFound` when either participant
    /// does not resolve to an existing user. Field-level validation happens
    /// before the store is reached.
    async fn send(&self, new: NewMessage) -> AppResult<Message>;

    /// All messages between the pair, in either direction, ascending by
    /// `created_at`. Empty when the two have never written, which is not an
    /// error.
    async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Vec<Message>>;

    /// One entry per distinct counterpart of `user_id`, each carrying only
    /// that counterpart's most recent message; newest conversation first.
    async fn conversations_for(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>>;

    /// Messages addressed to `user_id` that are still unread.
    async fn unread_for(&self, user_id: Uuid) -> AppResult<Vec<Message>>;

    /// Mark a message as read on behalf of its receiver. The flag reports
    /// whether this call performed the unread -> read transition; a repeat
    /// call returns the stored message unchanged with `false`. `NotFound`
    /// when no message with this id is addressed to `reader_id`.
    async fn mark_read(&self, message_id: Uuid, reader_id: Uuid) -> AppResult<(Message, bool)>;

    /// Replace the content. Sender-only, inside the modification window.
    async fn edit(&self, message_id: Uuid, editor_id: Uuid, content: String) -> AppResult<Message>;

    /// Remove the message permanently, returning the removed row so callers
    /// still know both participants. Same guards as `edit`.
    async fn delete(&self, message_id: Uuid, requester_id: Uuid) -> AppResult<Message>;
}
