use crate::websocket::events::ServerEvent;
use crate::websocket::{fanout, PresenceRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Seconds of keystroke silence after which a synthetic "stopped typing"
/// event is relayed to the recipient.
pub const TYPING_EXPIRY_SECS: u64 = 2;

/// Typing indicator relay: one cancellable timer per (typist, recipient)
/// pair, reset on every keystroke event. Nothing here is persisted; a
/// process restart simply forgets who was typing.
#[derive(Default, Clone)]
pub struct TypingTracker {
    timers: Arc<Mutex<HashMap<(Uuid, Uuid), JoinHandle<()>>>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relay the typing flag to the recipient's live connections (never back
    /// to the typist) and re-arm the expiry timer.
    pub async fn set_typing(
        &self,
        presence: &PresenceRegistry,
        typist_id: Uuid,
        recipient_id: Uuid,
        is_typing: bool,
    ) {
        fanout::fan_out(
            presence,
            &[recipient_id],
            &ServerEvent::Typing {
                sender_id: typist_id,
                is_typing,
            },
        )
        .await;

        let key = (typist_id, recipient_id);
        let mut timers = self.timers.lock().await;
        if let Some(stale) = timers.remove(&key) {
            stale.abort();
        }
        if is_typing {
            let presence = presence.clone();
            let timers_ref = Arc::clone(&self.timers);
            timers.insert(
                key,
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(TYPING_EXPIRY_SECS)).await;
                    fanout::fan_out(
                        &presence,
                        &[recipient_id],
                        &ServerEvent::Typing {
                            sender_id: typist_id,
                            is_typing: false,
                        },
                    )
                    .await;
                    timers_ref.lock().await.remove(&key);
                }),
            );
        }
    }

    /// Cancel every timer owned by `typist_id` (connection teardown).
    pub async fn clear_for(&self, typist_id: Uuid) {
        let mut timers = self.timers.lock().await;
        timers.retain(|(typist, _), handle| {
            if *typist == typist_id {
                handle.abort();
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(msg: axum::extract::ws::Message) -> serde_json::Value {
        match msg {
            axum::extract::ws::Message::Text(txt) => serde_json::from_str(&txt).unwrap(),
            other => panic!("unexpected ws message: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn silence_expires_into_a_stopped_typing_event() {
        let presence = PresenceRegistry::new();
        let tracker = TypingTracker::new();
        let typist = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let (_conn, mut rx) = presence.register(recipient).await;

        tracker.set_typing(&presence, typist, recipient, true).await;
        let started = parse(rx.recv().await.unwrap());
        assert_eq!(started["isTyping"], true);

        // no further keystrokes; the 2s timer fires on its own
        let stopped = parse(rx.recv().await.unwrap());
        assert_eq!(stopped["type"], "typing");
        assert_eq!(stopped["isTyping"], false);
        assert_eq!(stopped["senderId"], typist.to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_reset_the_timer_instead_of_stacking_events() {
        let presence = PresenceRegistry::new();
        let tracker = TypingTracker::new();
        let typist = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let (_conn, mut rx) = presence.register(recipient).await;

        tracker.set_typing(&presence, typist, recipient, true).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        tracker.set_typing(&presence, typist, recipient, true).await;

        let first = parse(rx.recv().await.unwrap());
        let second = parse(rx.recv().await.unwrap());
        assert_eq!(first["isTyping"], true);
        assert_eq!(second["isTyping"], true);

        // exactly one synthetic stop after the reset timer lapses
        let third = parse(rx.recv().await.unwrap());
        assert_eq!(third["isTyping"], false);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_stop_cancels_the_timer() {
        let presence = PresenceRegistry::new();
        let tracker = TypingTracker::new();
        let typist = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let (_conn, mut rx) = presence.register(recipient).await;

        tracker.set_typing(&presence, typist, recipient, true).await;
        tracker
            .set_typing(&presence, typist, recipient, false)
            .await;

        let started = parse(rx.recv().await.unwrap());
        let stopped = parse(rx.recv().await.unwrap());
        assert_eq!(started["isTyping"], true);
        assert_eq!(stopped["isTyping"], false);

        tokio::time::advance(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "no synthetic stop after an explicit one");
    }
}
