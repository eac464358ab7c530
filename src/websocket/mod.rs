use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod events;
pub mod fanout;
pub mod handlers;

/// One live connection: the channel feeding a single open socket.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub connection_id: Uuid,
    pub tx: UnboundedSender<Message>,
}

/// In-memory map of user id -> live connection handles. A user may hold
/// several connections (multiple tabs) and all of them receive pushes; a
/// user with none is simply offline. Volatile on purpose: a restart begins
/// from an empty registry. Constructed once per process and injected through
/// `AppState`.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    by_user: HashMap<Uuid, Vec<ConnectionHandle>>,
    // reverse index: connection id -> user id, so unregister is O(1)
    by_connection: HashMap<Uuid, Uuid>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `user_id`. Returns the connection id
    /// (used to unregister) and the receiving end the socket task drains.
    pub async fn register(&self, user_id: Uuid) -> (Uuid, UnboundedReceiver<Message>) {
        let (tx, rx) = unbounded_channel();
        let connection_id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        inner
            .by_user
            .entry(user_id)
            .or_default()
            .push(ConnectionHandle { connection_id, tx });
        inner.by_connection.insert(connection_id, user_id);
        (connection_id, rx)
    }

    /// Drop one connection. The user stays present while other connections
    /// remain.
    pub async fn unregister(&self, connection_id: Uuid) {
        let mut inner = self.inner.write().await;
        let Some(user_id) = inner.by_connection.remove(&connection_id) else {
            return;
        };
        let now_empty = match inner.by_user.get_mut(&user_id) {
            Some(handles) => {
                handles.retain(|h| h.connection_id != connection_id);
                handles.is_empty()
            }
            None => false,
        };
        if now_empty {
            inner.by_user.remove(&user_id);
        }
    }

    /// Every live handle for `user_id`; empty when the user is offline,
    /// which is not an error (it means "deliver via polling instead").
    pub async fn handles_for(&self, user_id: Uuid) -> Vec<ConnectionHandle> {
        self.inner
            .read()
            .await
            .by_user
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Push to every live handle of `user_id`, pruning handles whose socket
    /// task has gone away.
    pub async fn push_to_user(&self, user_id: Uuid, msg: &Message) {
        let mut inner = self.inner.write().await;
        let mut dropped = Vec::new();
        let now_empty = {
            let Some(handles) = inner.by_user.get_mut(&user_id) else {
                return;
            };
            handles.retain(|h| match h.tx.send(msg.clone()) {
                Ok(()) => true,
                Err(_) => {
                    dropped.push(h.connection_id);
                    false
                }
            });
            handles.is_empty()
        };
        if now_empty {
            inner.by_user.remove(&user_id);
        }
        for connection_id in dropped {
            inner.by_connection.remove(&connection_id);
            tracing::warn!(%user_id, %connection_id, "pruned dead live connection");
        }
    }
}
