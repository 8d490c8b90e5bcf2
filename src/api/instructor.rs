use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{post, put},
};
use serde_json::{Value, json};
use tower_sessions::Session;

use super::require_role;
use crate::course::catalog::{CourseSpec, LectureSpec, QuizSpec, SectionSpec};
use crate::error::Error;
use crate::server::AppState;
use crate::user::Role;

#[utoipa::path(
    post,
    context_path = "/api/instructor",
    path = "/courses",
    request_body = CourseSpec,
    responses((status = 200, description = "Course created"))
)]
pub async fn create_course(
    State(state): State<AppState>,
    session: Session,
    Json(spec): Json<CourseSpec>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    let id = state
        .enrollments
        .catalog
        .create_course(instructor_id, spec)
        .await?;
    Ok(Json(json!({ "id": id })))
}

#[utoipa::path(
    put,
    context_path = "/api/instructor",
    path = "/courses/{course_id}",
    params(("course_id" = i64, Path, description = "Course id")),
    request_body = CourseSpec,
    responses((status = 200, description = "Course updated"))
)]
pub async fn update_course(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<i64>,
    Json(spec): Json<CourseSpec>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    state
        .enrollments
        .catalog
        .update_course(instructor_id, course_id, spec)
        .await?;
    Ok(Json(json!({ "message": "updated" })))
}

#[utoipa::path(
    delete,
    context_path = "/api/instructor",
    path = "/courses/{course_id}",
    params(("course_id" = i64, Path, description = "Course id")),
    responses((status = 200, description = "Course deleted"))
)]
pub async fn delete_course(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<i64>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    state
        .enrollments
        .catalog
        .delete_course(instructor_id, course_id)
        .await?;
    Ok(Json(json!({ "message": "deleted" })))
}

#[utoipa::path(
    post,
    context_path = "/api/instructor",
    path = "/courses/{course_id}/sections",
    params(("course_id" = i64, Path, description = "Course id")),
    request_body = SectionSpec,
    responses((status = 200, description = "Section created"))
)]
pub async fn add_section(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<i64>,
    Json(spec): Json<SectionSpec>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    let id = state
        .enrollments
        .catalog
        .add_section(instructor_id, course_id, spec)
        .await?;
    Ok(Json(json!({ "id": id })))
}

#[utoipa::path(
    put,
    context_path = "/api/instructor",
    path = "/sections/{section_id}",
    params(("section_id" = i64, Path, description = "Section id")),
    request_body = SectionSpec,
    responses((status = 200, description = "Section updated"))
)]
pub async fn update_section(
    State(state): State<AppState>,
    session: Session,
    Path(section_id): Path<i64>,
    Json(spec): Json<SectionSpec>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    state
        .enrollments
        .catalog
        .update_section(instructor_id, section_id, spec)
        .await?;
    Ok(Json(json!({ "message": "updated" })))
}

#[utoipa::path(
    delete,
    context_path = "/api/instructor",
    path = "/sections/{section_id}",
    params(("section_id" = i64, Path, description = "Section id")),
    responses((status = 200, description = "Section deleted"))
)]
pub async fn delete_section(
    State(state): State<AppState>,
    session: Session,
    Path(section_id): Path<i64>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    state
        .enrollments
        .catalog
        .delete_section(instructor_id, section_id)
        .await?;
    Ok(Json(json!({ "message": "deleted" })))
}

#[utoipa::path(
    post,
    context_path = "/api/instructor",
    path = "/sections/{section_id}/lectures",
    params(("section_id" = i64, Path, description = "Section id")),
    request_body = LectureSpec,
    responses((status = 200, description = "Lecture created"))
)]
pub async fn add_lecture(
    State(state): State<AppState>,
    session: Session,
    Path(section_id): Path<i64>,
    Json(spec): Json<LectureSpec>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    let id = state
        .enrollments
        .catalog
        .add_lecture(instructor_id, section_id, spec)
        .await?;
    Ok(Json(json!({ "id": id })))
}

#[utoipa::path(
    put,
    context_path = "/api/instructor",
    path = "/lectures/{lecture_id}",
    params(("lecture_id" = i64, Path, description = "Lecture id")),
    request_body = LectureSpec,
    responses((status = 200, description = "Lecture updated"))
)]
pub async fn update_lecture(
    State(state): State<AppState>,
    session: Session,
    Path(lecture_id): Path<i64>,
    Json(spec): Json<LectureSpec>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    state
        .enrollments
        .catalog
        .update_lecture(instructor_id, lecture_id, spec)
        .await?;
    Ok(Json(json!({ "message": "updated" })))
}

#[utoipa::path(
    delete,
    context_path = "/api/instructor",
    path = "/lectures/{lecture_id}",
    params(("lecture_id" = i64, Path, description = "Lecture id")),
    responses((status = 200, description = "Lecture deleted"))
)]
pub async fn delete_lecture(
    State(state): State<AppState>,
    session: Session,
    Path(lecture_id): Path<i64>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    state
        .enrollments
        .catalog
        .delete_lecture(instructor_id, lecture_id)
        .await?;
    Ok(Json(json!({ "message": "deleted" })))
}

#[utoipa::path(
    put,
    context_path = "/api/instructor",
    path = "/sections/{section_id}/quiz",
    params(("section_id" = i64, Path, description = "Section id")),
    request_body = QuizSpec,
    responses(
        (status = 200, description = "Quiz replaced"),
        (status = 400, description = "Invalid quiz definition")
    )
)]
pub async fn set_quiz(
    State(state): State<AppState>,
    session: Session,
    Path(section_id): Path<i64>,
    Json(spec): Json<QuizSpec>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    state
        .enrollments
        .catalog
        .set_quiz(instructor_id, section_id, spec)
        .await?;
    Ok(Json(json!({ "message": "quiz updated" })))
}

#[utoipa::path(
    delete,
    context_path = "/api/instructor",
    path = "/sections/{section_id}/quiz",
    params(("section_id" = i64, Path, description = "Section id")),
    responses((status = 200, description = "Quiz removed"))
)]
pub async fn delete_quiz(
    State(state): State<AppState>,
    session: Session,
    Path(section_id): Path<i64>,
) -> Result<Json<Value>, Error> {
    let instructor_id = require_role(&session, &state.database, Role::Instructor).await?;
    state
        .enrollments
        .catalog
        .delete_quiz(instructor_id, section_id)
        .await?;
    Ok(Json(json!({ "message": "quiz removed" })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/courses", post(create_course))
        .route(
            "/courses/{course_id}",
            put(update_course).delete(delete_course),
        )
        .route("/courses/{course_id}/sections", post(add_section))
        .route(
            "/sections/{section_id}",
            put(update_section).delete(delete_section),
        )
        .route("/sections/{section_id}/lectures", post(add_lecture))
        .route(
            "/lectures/{lecture_id}",
            put(update_lecture).delete(delete_lecture),
        )
        .route(
            "/sections/{section_id}/quiz",
            put(set_quiz).delete(delete_quiz),
        )
}
