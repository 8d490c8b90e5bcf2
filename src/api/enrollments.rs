use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::ToSchema;

use super::require_role;
use crate::enrollment::progress::Enrollment;
use crate::enrollment::store::{EnrollmentWithCourse, QuizSubmission};
use crate::error::Error;
use crate::server::AppState;
use crate::user::Role;
use crate::viewer::{Navigator, Position};

/// `enrolled: false` with a 200 is deliberate: an unenrolled course page is a
/// normal state for the client, not an error to toast about.
#[derive(Serialize, ToSchema)]
pub struct EnrollmentStatus {
    pub enrolled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<Enrollment>,
}

#[derive(Serialize, ToSchema)]
pub struct EnrollmentEnvelope {
    pub enrollment: Enrollment,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteLectureRequest {
    #[serde(default)]
    pub watch_time: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitQuizRequest {
    pub answers: Vec<Option<i64>>,
}

#[derive(Serialize, ToSchema)]
pub struct ResumePosition {
    pub position: Option<Position>,
}

#[utoipa::path(
    get,
    context_path = "/api/enrollments",
    path = "/",
    responses((status = 200, description = "All enrollments with their courses", body = Vec<EnrollmentWithCourse>))
)]
pub async fn list_enrollments(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<EnrollmentWithCourse>>, Error> {
    let student_id = require_role(&session, &state.database, Role::Student).await?;
    Ok(Json(state.enrollments.list(student_id).await?))
}

#[utoipa::path(
    get,
    context_path = "/api/enrollments",
    path = "/{course_id}",
    params(("course_id" = i64, Path, description = "Course id")),
    responses((status = 200, description = "Enrollment status for this course", body = EnrollmentStatus))
)]
pub async fn get_enrollment(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<i64>,
) -> Result<Json<EnrollmentStatus>, Error> {
    let student_id = require_role(&session, &state.database, Role::Student).await?;
    let enrollment = state.enrollments.get(student_id, course_id).await?;
    Ok(Json(EnrollmentStatus {
        enrolled: enrollment.is_some(),
        enrollment,
    }))
}

#[utoipa::path(
    post,
    context_path = "/api/enrollments",
    path = "/{course_id}/lectures/{lecture_id}/complete",
    params(
        ("course_id" = i64, Path, description = "Course id"),
        ("lecture_id" = i64, Path, description = "Lecture id")
    ),
    request_body = CompleteLectureRequest,
    responses(
        (status = 200, description = "Updated enrollment", body = EnrollmentEnvelope),
        (status = 400, description = "Invalid watch time"),
        (status = 404, description = "Enrollment or lecture not found")
    )
)]
pub async fn complete_lecture(
    State(state): State<AppState>,
    session: Session,
    Path((course_id, lecture_id)): Path<(i64, i64)>,
    Json(req): Json<CompleteLectureRequest>,
) -> Result<Json<EnrollmentEnvelope>, Error> {
    let student_id = require_role(&session, &state.database, Role::Student).await?;
    let enrollment = state
        .enrollments
        .mark_lecture_complete(student_id, course_id, lecture_id, req.watch_time)
        .await?;
    Ok(Json(EnrollmentEnvelope { enrollment }))
}

#[utoipa::path(
    post,
    context_path = "/api/enrollments",
    path = "/{course_id}/sections/{section_id}/quiz",
    params(
        ("course_id" = i64, Path, description = "Course id"),
        ("section_id" = i64, Path, description = "Section id")
    ),
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "Graded submission with updated enrollment", body = QuizSubmission),
        (status = 400, description = "Malformed answer set"),
        (status = 404, description = "Enrollment, section, or quiz not found")
    )
)]
pub async fn submit_quiz(
    State(state): State<AppState>,
    session: Session,
    Path((course_id, section_id)): Path<(i64, i64)>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<Json<QuizSubmission>, Error> {
    let student_id = require_role(&session, &state.database, Role::Student).await?;
    let submission = state
        .enrollments
        .submit_quiz(student_id, course_id, section_id, req.answers)
        .await?;
    Ok(Json(submission))
}

#[utoipa::path(
    get,
    context_path = "/api/enrollments",
    path = "/{course_id}/resume",
    params(("course_id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Where the viewer should land", body = ResumePosition),
        (status = 404, description = "Not enrolled")
    )
)]
pub async fn resume(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<i64>,
) -> Result<Json<ResumePosition>, Error> {
    let student_id = require_role(&session, &state.database, Role::Student).await?;
    let enrollment = state
        .enrollments
        .get(student_id, course_id)
        .await?
        .ok_or(Error::NotFound("enrollment"))?;
    let course = state.enrollments.catalog.get_course(course_id).await?;
    let navigator = Navigator::new(&course, &enrollment, state.config.free_navigation);
    Ok(Json(ResumePosition {
        position: navigator.initial(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments))
        .route("/{course_id}", get(get_enrollment))
        .route("/{course_id}/resume", get(resume))
        .route(
            "/{course_id}/lectures/{lecture_id}/complete",
            post(complete_lecture),
        )
        .route("/{course_id}/sections/{section_id}/quiz", post(submit_quiz))
}
