use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use tower_sessions::Session;

use super::require_role;
use crate::course::content::{CourseSummary, PublicCourse};
use crate::enrollment::progress::Enrollment;
use crate::error::Error;
use crate::server::AppState;
use crate::user::Role;

#[utoipa::path(
    get,
    context_path = "/api/courses",
    path = "/",
    responses((status = 200, description = "Published courses", body = Vec<CourseSummary>))
)]
pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<CourseSummary>>, Error> {
    Ok(Json(state.enrollments.catalog.list_published().await?))
}

#[utoipa::path(
    get,
    context_path = "/api/courses",
    path = "/{course_id}",
    params(("course_id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course content with answer keys stripped", body = PublicCourse),
        (status = 404, description = "No such course")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> Result<Json<PublicCourse>, Error> {
    let course = state.enrollments.catalog.get_course(course_id).await?;
    if !course.summary.is_published {
        return Err(Error::NotFound("course"));
    }
    Ok(Json(course.into()))
}

#[utoipa::path(
    post,
    context_path = "/api/courses",
    path = "/{course_id}/enroll",
    params(("course_id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrolled", body = Enrollment),
        (status = 400, description = "Already enrolled"),
        (status = 404, description = "No such course")
    )
)]
pub async fn enroll(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<i64>,
) -> Result<Json<Enrollment>, Error> {
    let student_id = require_role(&session, &state.database, Role::Student).await?;
    Ok(Json(state.enrollments.enroll(student_id, course_id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses))
        .route("/{course_id}", get(get_course))
        .route("/{course_id}/enroll", post(enroll))
}
