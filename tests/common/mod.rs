use futures_util::StreamExt;
use lostfound_messaging::config::Config;
use lostfound_messaging::routes;
use lostfound_messaging::services::memory_store::MemoryMessageStore;
use lostfound_messaging::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestApp {
    pub base_url: String,
    pub state: AppState,
    pub store: Arc<MemoryMessageStore>,
    pub config: Arc<Config>,
}

/// Boot the full router on an ephemeral port, backed by the in-memory store.
pub async fn start_app() -> TestApp {
    let store = Arc::new(MemoryMessageStore::new());
    let config = Arc::new(Config::test_defaults());
    let state = AppState::new(config.clone(), store.clone());

    let app = routes::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    TestApp {
        base_url: format!("http://{}", addr),
        state,
        store,
        config,
    }
}

impl TestApp {
    /// Seed a user the store should treat as existing.
    pub async fn seed_user(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.store.add_user(id).await;
        id
    }

    /// Mint a session token the way the platform auth module would.
    pub fn token_for(&self, user_id: Uuid) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};
        let claims = lostfound_messaging::middleware::auth::Claims {
            sub: user_id.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .unwrap()
    }

    /// Open an identified live connection for `user_id` and wait until the
    /// presence registry has picked it up, so a following send cannot race
    /// the registration.
    pub async fn connect_identified(&self, user_id: Uuid) -> WsClient {
        let before = self
            .state
            .chat
            .presence()
            .handles_for(user_id)
            .await
            .len();
        let url = format!(
            "{}/ws?token={}",
            self.base_url.replacen("http", "ws", 1),
            self.token_for(user_id)
        );
        let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        loop {
            let now = self
                .state
                .chat
                .presence()
                .handles_for(user_id)
                .await
                .len();
            if now > before {
                return client;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Open a live connection with no token at all.
    pub async fn connect_anonymous(&self) -> WsClient {
        let url = format!("{}/ws", self.base_url.replacen("http", "ws", 1));
        let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        client
    }
}

/// Next event on the socket as JSON, failing the test after two seconds.
pub async fn next_event(client: &mut WsClient) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for a live event")
        .expect("connection closed")
        .expect("transport error");
    match msg {
        WsMessage::Text(txt) => serde_json::from_str(&txt).unwrap(),
        other => panic!("unexpected ws message: {other:?}"),
    }
}

/// Assert that nothing arrives on the socket within the grace period.
pub async fn assert_silent(client: &mut WsClient) {
    let outcome = tokio::time::timeout(Duration::from_millis(300), client.next()).await;
    assert!(outcome.is_err(), "expected no event, got {outcome:?}");
}
