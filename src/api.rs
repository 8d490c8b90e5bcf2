pub mod auth;
pub mod catalog;
pub mod enrollments;
pub mod instructor;

use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::error::Error;
use crate::user::{self, Role};

pub const USER_ID_KEY: &str = "user_id";

/// The logged-in user's id, or 401.
pub async fn current_user(session: &Session) -> Result<i64, Error> {
    session
        .get::<i64>(USER_ID_KEY)
        .await?
        .ok_or(Error::Unauthorized)
}

/// The logged-in user's id, checked against the stored role. Acting outside
/// one's role is a 403, not a 401: the session is valid, the action is not.
pub async fn require_role(
    session: &Session,
    database: &SqlitePool,
    role: Role,
) -> Result<i64, Error> {
    let user_id = current_user(session).await?;
    if user::get_role(database, user_id).await? != role {
        return Err(Error::Forbidden(format!("requires {role} role")));
    }
    Ok(user_id)
}
