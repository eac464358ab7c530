use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Read-only surface over the user module owned by the rest of the
/// platform. The messaging core only ever asks whether an id resolves to a
/// real user.
pub struct UserService;

impl UserService {
    pub async fn exists(db: &Pool<Postgres>, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(db)
                .await?;
        Ok(exists)
    }
}
