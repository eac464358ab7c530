/// OpenAPI documentation for the lost-and-found messaging service
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lost & Found Messaging API",
        version = "0.1.0",
        description = "Direct messaging between item reporters: conversations, read receipts, and live delivery over WebSocket",
    ),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Messages", description = "Message CRUD and conversation queries"),
        (name = "WebSocket", description = "Real-time delivery via /ws"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn title() -> &'static str {
        "Lost & Found Messaging"
    }

    pub fn openapi_json_path() -> &'static str {
        "/openapi.json"
    }
}
