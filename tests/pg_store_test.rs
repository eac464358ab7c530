//! Postgres engine tests. Ignored by default: point `TEST_DATABASE_URL` at a
//! disposable database and run with `cargo test -- --ignored`.

use lostfound_messaging::error::AppError;
use lostfound_messaging::migrations;
use lostfound_messaging::models::message::NewMessage;
use lostfound_messaging::services::message_store::MessageStore;
use lostfound_messaging::services::pg_store::PgMessageStore;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

async fn connect() -> Pool<Postgres> {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("set TEST_DATABASE_URL to run the Postgres store tests");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .unwrap();
    migrations::run_all(&pool).await.unwrap();
    pool
}

async fn seed_user(pool: &Pool<Postgres>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
        .bind(id)
        .bind(format!("user-{id}"))
        .execute(pool)
        .await
        .unwrap();
    id
}

fn new_message(sender: Uuid, receiver: Uuid, content: &str) -> NewMessage {
    NewMessage {
        sender_id: sender,
        receiver_id: receiver,
        content: content.into(),
        attachment_url: None,
    }
}

#[tokio::test]
#[ignore]
async fn send_list_and_read_round_trip() {
    let pool = connect().await;
    let store = PgMessageStore::new(pool.clone());
    let alice = seed_user(&pool).await;
    let bob = seed_user(&pool).await;

    let sent = store.send(new_message(alice, bob, "hello")).await.unwrap();
    assert!(!sent.is_read);

    let listed = store.conversation(bob, alice).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, sent.id);

    let (read, transitioned) = store.mark_read(sent.id, bob).await.unwrap();
    assert!(transitioned);
    let (again, transitioned) = store.mark_read(sent.id, bob).await.unwrap();
    assert!(!transitioned);
    assert_eq!(read.read_at, again.read_at);

    assert!(store.unread_for(bob).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn guarded_mutations_reject_precisely() {
    let pool = connect().await;
    let store = PgMessageStore::new(pool.clone());
    let alice = seed_user(&pool).await;
    let bob = seed_user(&pool).await;

    let sent = store.send(new_message(alice, bob, "original")).await.unwrap();

    let err = store
        .edit(sent.id, bob, "not yours".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // push the row outside the window and retry as the owner
    sqlx::query("UPDATE messages SET created_at = created_at - INTERVAL '16 minutes' WHERE id = $1")
        .bind(sent.id)
        .execute(&pool)
        .await
        .unwrap();
    let err = store
        .edit(sent.id, alice, "too late".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::WindowExpired { .. }));
    let err = store.delete(sent.id, alice).await.unwrap_err();
    assert!(matches!(err, AppError::WindowExpired { .. }));

    let listed = store.conversation(alice, bob).await.unwrap();
    assert_eq!(listed[0].content, "original");
}

#[tokio::test]
#[ignore]
async fn inbox_deduplicates_per_counterpart() {
    let pool = connect().await;
    let store = PgMessageStore::new(pool.clone());
    let alice = seed_user(&pool).await;
    let bob = seed_user(&pool).await;
    let carol = seed_user(&pool).await;

    store.send(new_message(alice, bob, "one")).await.unwrap();
    store.send(new_message(bob, alice, "two")).await.unwrap();
    let latest = store.send(new_message(alice, bob, "three")).await.unwrap();
    store.send(new_message(carol, alice, "hi")).await.unwrap();

    let inbox = store.conversations_for(alice).await.unwrap();
    assert_eq!(inbox.len(), 2);
    let with_bob = inbox.iter().find(|s| s.other_user_id == bob).unwrap();
    assert_eq!(with_bob.last_message.id, latest.id);
}
