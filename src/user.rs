use std::fmt;
use std::str::FromStr;

use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Instructor => write!(f, "instructor"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            other => Err(Error::validation(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

pub async fn create_user(
    database: &SqlitePool,
    name: String,
    email: String,
    password: String,
    role: Role,
) -> Result<i64, Error> {
    if name.trim().is_empty() || email.trim().is_empty() {
        return Err(Error::validation("name and email must not be empty"));
    }
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
        .to_string();
    let role = role.to_string();
    let user = sqlx::query("INSERT INTO user (name, email, password, role) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .execute(database)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::validation("email is already registered")
            }
            other => other.into(),
        })?;
    Ok(user.last_insert_rowid())
}

pub async fn login(database: &SqlitePool, email: String, password: String) -> Result<i64, Error> {
    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT id, password FROM user WHERE email = ?")
            .bind(email)
            .fetch_optional(database)
            .await?;
    let Some((id, stored_hash)) = row else {
        return Err(Error::validation("invalid email or password"));
    };
    let parsed_hash = PasswordHash::new(&stored_hash)
        .map_err(|e| anyhow::anyhow!("failed to parse password hash: {e}"))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| Error::validation("invalid email or password"))?;
    Ok(id)
}

pub async fn get_user_info(database: &SqlitePool, id: i64) -> Result<UserInfo, Error> {
    let row: Option<(i64, String, String, String)> =
        sqlx::query_as("SELECT id, name, email, role FROM user WHERE id = ?")
            .bind(id)
            .fetch_optional(database)
            .await?;
    let Some((id, name, email, role)) = row else {
        return Err(Error::NotFound("user"));
    };
    Ok(UserInfo {
        id,
        name,
        email,
        role: role.parse()?,
    })
}

/// The role stored for a session's user, for route gating.
pub async fn get_role(database: &SqlitePool, id: i64) -> Result<Role, Error> {
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM user WHERE id = ?")
        .bind(id)
        .fetch_optional(database)
        .await?;
    match role {
        Some(role) => role.parse(),
        None => Err(Error::NotFound("user")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        // Single connection: each pooled connection to :memory: would get
        // its own empty database.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn register_login_roundtrip() {
        let db = test_pool().await;
        let id = create_user(
            &db,
            "Ada".into(),
            "ada@example.com".into(),
            "hunter2".into(),
            Role::Student,
        )
        .await
        .unwrap();
        let logged_in = login(&db, "ada@example.com".into(), "hunter2".into())
            .await
            .unwrap();
        assert_eq!(id, logged_in);
        let info = get_user_info(&db, id).await.unwrap();
        assert_eq!(info.role, Role::Student);
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let db = test_pool().await;
        create_user(
            &db,
            "Ada".into(),
            "ada@example.com".into(),
            "hunter2".into(),
            Role::Student,
        )
        .await
        .unwrap();
        assert!(
            login(&db, "ada@example.com".into(), "wrong".into())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let db = test_pool().await;
        create_user(
            &db,
            "Ada".into(),
            "ada@example.com".into(),
            "hunter2".into(),
            Role::Student,
        )
        .await
        .unwrap();
        let err = create_user(
            &db,
            "Eve".into(),
            "ada@example.com".into(),
            "secret".into(),
            Role::Instructor,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
