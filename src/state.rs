use crate::config::Config;
use crate::services::chat_service::ChatService;
use crate::services::message_store::MessageStore;
use crate::websocket::PresenceRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the process-wide state from a backing store: one presence
    /// registry and one chat service per process.
    pub fn new(config: Arc<Config>, store: Arc<dyn MessageStore>) -> Self {
        let presence = PresenceRegistry::new();
        let chat = Arc::new(ChatService::new(store, presence));
        Self { chat, config }
    }
}
