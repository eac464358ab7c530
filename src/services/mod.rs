pub mod chat_service;
pub mod memory_store;
pub mod message_store;
pub mod pg_store;
pub mod typing;
pub mod user_service;
