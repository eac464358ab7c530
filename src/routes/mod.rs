use crate::state::AppState;
use axum::routing::{get, patch, post};
use axum::{middleware, Json, Router};

pub mod messages;
use messages::{
    delete_message, edit_message, get_conversation, get_conversations, get_unread, mark_read,
    send_message,
};

// OpenAPI endpoint handler
async fn openapi_json() -> Json<serde_json::Value> {
    use utoipa::OpenApi;
    Json(serde_json::to_value(crate::openapi::ApiDoc::openapi()).unwrap_or_default())
}

// Swagger UI handler
async fn swagger_ui() -> axum::response::Html<&'static str> {
    axum::response::Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Lost & Found Messaging API</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: "/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>"#,
    )
}

// Documentation entry point
async fn docs() -> axum::response::Html<&'static str> {
    axum::response::Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Lost & Found Messaging API</title>
</head>
<body>
    <h1>Lost &amp; Found Messaging API</h1>
    <p>Choose your preferred documentation viewer:</p>
    <ul>
        <li><a href="/swagger-ui">Swagger UI (interactive)</a></li>
        <li><a href="/openapi.json">OpenAPI JSON (raw)</a></li>
    </ul>
</body>
</html>"#,
    )
}

pub fn build_router(state: AppState) -> Router {
    // Service introspection endpoints, open for healthchecks
    let introspection: Router<AppState> = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/openapi.json", get(openapi_json))
        .route("/swagger-ui", get(swagger_ui))
        .route("/docs", get(docs));

    // Message endpoints plus the live connection upgrade. The identity
    // middleware attaches the verified caller when a token is present;
    // handlers fall back to explicit user parameters otherwise.
    let api: Router<AppState> = Router::new()
        .route("/messages", post(send_message))
        .route("/messages/conversation/:other_user_id", get(get_conversation))
        .route("/messages/conversations", get(get_conversations))
        .route("/messages/unread", get(get_unread))
        .route("/messages/:id/read", patch(mark_read))
        .route("/messages/:id", patch(edit_message).delete(delete_message))
        .route("/ws", get(crate::websocket::handlers::ws_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::identity_middleware,
        ));

    let router = introspection.merge(api);
    crate::middleware::with_defaults(router).with_state(state)
}
