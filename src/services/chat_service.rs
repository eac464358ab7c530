use crate::error::{AppError, AppResult};
use crate::models::message::{ConversationSummary, Message, NewMessage};
use crate::services::message_store::MessageStore;
use crate::services::typing::TypingTracker;
use crate::websocket::events::ServerEvent;
use crate::websocket::{fanout, PresenceRegistry};
use std::sync::Arc;
use uuid::Uuid;

/// The single entry point for every conversation operation.
///
/// Both the HTTP mirror and the socket protocol handler call into this
/// service, so a mutation always persists first and then reaches every live
/// connection of the affected users, whichever transport it arrived on. No
/// event is fanned out for an operation that failed at the store.
pub struct ChatService {
    store: Arc<dyn MessageStore>,
    presence: PresenceRegistry,
    typing: TypingTracker,
}

impl ChatService {
    pub fn new(store: Arc<dyn MessageStore>, presence: PresenceRegistry) -> Self {
        Self {
            store,
            presence,
            typing: TypingTracker::new(),
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub async fn send_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        attachment_url: Option<String>,
    ) -> AppResult<Message> {
        if sender_id == receiver_id {
            return Err(AppError::Validation(
                "sender and receiver must be different users".into(),
            ));
        }
        if content.trim().is_empty() && attachment_url.is_none() {
            return Err(AppError::Validation(
                "content is required when there is no attachment".into(),
            ));
        }

        let message = self
            .store
            .send(NewMessage {
                sender_id,
                receiver_id,
                content,
                attachment_url,
            })
            .await?;

        fanout::fan_out(
            &self.presence,
            &message.participants(),
            &ServerEvent::NewMessage {
                message: message.clone(),
            },
        )
        .await;
        Ok(message)
    }

    pub async fn edit_message(
        &self,
        editor_id: Uuid,
        message_id: Uuid,
        content: String,
    ) -> AppResult<Message> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("content must not be empty".into()));
        }

        let message = self.store.edit(message_id, editor_id, content).await?;
        fanout::fan_out(
            &self.presence,
            &message.participants(),
            &ServerEvent::MessageEdited {
                message: message.clone(),
            },
        )
        .await;
        Ok(message)
    }

    pub async fn delete_message(&self, requester_id: Uuid, message_id: Uuid) -> AppResult<()> {
        let removed = self.store.delete(message_id, requester_id).await?;
        fanout::fan_out(
            &self.presence,
            &removed.participants(),
            &ServerEvent::MessageDeleted {
                message_id: removed.id,
            },
        )
        .await;
        Ok(())
    }

    /// Mark as read and push a read receipt to the sender. A repeat call is
    /// an idempotent no-op: same message back, no second receipt.
    pub async fn mark_read(&self, reader_id: Uuid, message_id: Uuid) -> AppResult<Message> {
        let (message, transitioned) = self.store.mark_read(message_id, reader_id).await?;
        if transitioned {
            if let Some(read_at) = message.read_at {
                fanout::fan_out(
                    &self.presence,
                    &[message.sender_id],
                    &ServerEvent::MessageRead {
                        message_id: message.id,
                        read_at,
                    },
                )
                .await;
            }
        }
        Ok(message)
    }

    pub async fn typing(&self, typist_id: Uuid, recipient_id: Uuid, is_typing: bool) {
        self.typing
            .set_typing(&self.presence, typist_id, recipient_id, is_typing)
            .await;
    }

    /// Teardown hook for the protocol handler: forget any pending typing
    /// timers of the departing user.
    pub async fn connection_closed(&self, user_id: Uuid) {
        self.typing.clear_for(user_id).await;
    }

    pub async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Vec<Message>> {
        self.store.conversation(user_a, user_b).await
    }

    pub async fn conversations_for(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        self.store.conversations_for(user_id).await
    }

    pub async fn unread_for(&self, user_id: Uuid) -> AppResult<Vec<Message>> {
        self.store.unread_for(user_id).await
    }
}
