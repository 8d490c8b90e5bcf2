use axum::{Json, Router, extract::State, routing::get, routing::post};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use utoipa::ToSchema;

use super::{USER_ID_KEY, current_user};
use crate::error::Error;
use crate::server::AppState;
use crate::user::{self, Role, UserInfo};

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Student
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    post,
    context_path = "/api/auth",
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created"),
        (status = 400, description = "Invalid or duplicate registration")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Value>, Error> {
    let id = user::create_user(&state.database, req.name, req.email, req.password, req.role)
        .await?;
    Ok(Json(json!({ "id": id })))
}

#[utoipa::path(
    post,
    context_path = "/api/auth",
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserInfo),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserInfo>, Error> {
    let id = user::login(&state.database, req.email, req.password).await?;
    session.insert(USER_ID_KEY, id).await?;
    Ok(Json(user::get_user_info(&state.database, id).await?))
}

#[utoipa::path(
    post,
    context_path = "/api/auth",
    path = "/logout",
    responses((status = 200, description = "Session cleared"))
)]
pub async fn logout(session: Session) -> Result<Json<Value>, Error> {
    session.delete().await?;
    Ok(Json(json!({ "message": "logged out" })))
}

#[utoipa::path(
    get,
    context_path = "/api/auth",
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me(State(state): State<AppState>, session: Session) -> Result<Json<UserInfo>, Error> {
    let user_id = current_user(&session).await?;
    Ok(Json(user::get_user_info(&state.database, user_id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
