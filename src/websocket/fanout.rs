use super::events::ServerEvent;
use super::PresenceRegistry;
use axum::extract::ws::Message;
use uuid::Uuid;

/// Deliver one event to every live connection of every user in `targets`.
///
/// Offline users are skipped silently; the HTTP mirror's list endpoints are
/// the catch-up path. Delivery failures are logged and pruned per handle,
/// never surfaced: by the time fan-out runs the triggering mutation is
/// already durable.
pub async fn fan_out(presence: &PresenceRegistry, targets: &[Uuid], event: &ServerEvent) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize outbound event");
            return;
        }
    };
    let msg = Message::Text(payload);
    for user_id in targets {
        presence.push_to_user(*user_id, &msg).await;
    }
}
