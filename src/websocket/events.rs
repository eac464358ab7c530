//! Wire-level event types for the live connection protocol.
//!
//! Both directions use the same envelope: a JSON object whose `type` field
//! names the event and whose remaining fields are the payload. Names and
//! field casing match what the web client emits and listens for.

use crate::error::AppError;
use crate::models::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events a client may emit once its connection is identified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "sendMessage", rename_all = "camelCase")]
    SendMessage {
        receiver_id: Uuid,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attachment_url: Option<String>,
    },

    #[serde(rename = "editMessage", rename_all = "camelCase")]
    EditMessage { message_id: Uuid, content: String },

    #[serde(rename = "deleteMessage", rename_all = "camelCase")]
    DeleteMessage { message_id: Uuid },

    /// Ephemeral; relayed to the recipient only, never persisted.
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing { recipient_id: Uuid, is_typing: bool },

    #[serde(rename = "markRead", rename_all = "camelCase")]
    MarkRead { message_id: Uuid },
}

/// Events pushed to live connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// To every live connection of sender and receiver.
    #[serde(rename = "newMessage")]
    NewMessage {
        #[serde(flatten)]
        message: Message,
    },

    /// To both participants of the edited message.
    #[serde(rename = "messageEdited")]
    MessageEdited {
        #[serde(flatten)]
        message: Message,
    },

    /// To both participants.
    #[serde(rename = "messageDeleted", rename_all = "camelCase")]
    MessageDeleted { message_id: Uuid },

    /// To the recipient only (never echoed back to the typist).
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing { sender_id: Uuid, is_typing: bool },

    /// Read receipt, to the message's sender only.
    #[serde(rename = "messageRead", rename_all = "camelCase")]
    MessageRead {
        message_id: Uuid,
        read_at: DateTime<Utc>,
    },

    /// Rejection of an inbound event, to the requesting socket only.
    #[serde(rename = "error", rename_all = "camelCase")]
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Render a store/validation failure as an error event, reusing the
    /// codes of the HTTP error mapping so both transports speak the same
    /// vocabulary.
    pub fn from_error(err: &AppError) -> Self {
        let (_, body) = crate::middleware::error_handling::map_error(err);
        ServerEvent::Error {
            code: body.code,
            message: body.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            content: "found your keys".into(),
            attachment_url: None,
            is_read: false,
            read_at: None,
            is_edited: false,
            edited_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn new_message_event_is_a_flat_message_object() {
        let message = sample_message();
        let event = ServerEvent::NewMessage {
            message: message.clone(),
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "newMessage");
        assert_eq!(value["id"], message.id.to_string());
        assert_eq!(value["senderId"], message.sender_id.to_string());
        assert_eq!(value["isRead"], false);
    }

    #[test]
    fn typing_event_field_casing_matches_the_client() {
        let sender = Uuid::new_v4();
        let value = serde_json::to_value(ServerEvent::Typing {
            sender_id: sender,
            is_typing: true,
        })
        .unwrap();

        assert_eq!(value["type"], "typing");
        assert_eq!(value["senderId"], sender.to_string());
        assert_eq!(value["isTyping"], true);
    }

    #[test]
    fn client_events_parse_from_tagged_json() {
        let receiver = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"sendMessage","receiverId":"{receiver}","content":"hi"}}"#
        );
        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        match event {
            ClientEvent::SendMessage {
                receiver_id,
                content,
                attachment_url,
            } => {
                assert_eq!(receiver_id, receiver);
                assert_eq!(content, "hi");
                assert!(attachment_url.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn rejections_carry_the_http_error_code() {
        let event = ServerEvent::from_error(&AppError::Forbidden);
        match event {
            ServerEvent::Error { code, .. } => assert_eq!(code, "AUTHORIZATION_ERROR"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
