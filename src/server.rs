use axum::Router;
use sqlx::SqlitePool;
use time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::config::Config;
use crate::enrollment::store::EnrollmentStore;

#[derive(Clone)]
pub struct AppState {
    pub database: SqlitePool,
    pub enrollments: EnrollmentStore,
    pub config: Config,
}

impl AppState {
    pub fn new(database: SqlitePool, config: Config) -> Self {
        let enrollments = EnrollmentStore::new(database.clone());
        Self {
            database,
            enrollments,
            config,
        }
    }
}

#[derive(OpenApi)]
#[openapi(paths(
    api::auth::register,
    api::auth::login,
    api::auth::logout,
    api::auth::me,
    api::catalog::list_courses,
    api::catalog::get_course,
    api::catalog::enroll,
    api::enrollments::list_enrollments,
    api::enrollments::get_enrollment,
    api::enrollments::resume,
    api::enrollments::complete_lecture,
    api::enrollments::submit_quiz,
    api::instructor::create_course,
    api::instructor::update_course,
    api::instructor::delete_course,
    api::instructor::add_section,
    api::instructor::update_section,
    api::instructor::delete_section,
    api::instructor::add_lecture,
    api::instructor::update_lecture,
    api::instructor::delete_lecture,
    api::instructor::set_quiz,
    api::instructor::delete_quiz,
))]
pub struct ApiDoc;

/// Assemble the full application router: API routes behind the session
/// layer, Swagger UI alongside.
pub async fn build_router(state: AppState) -> anyhow::Result<Router> {
    let session_store = SqliteStore::new(state.database.clone());
    session_store.migrate().await?;
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::days(5)));

    let api_routes = Router::new()
        .nest("/auth", api::auth::router())
        .nest("/courses", api::catalog::router())
        .nest("/enrollments", api::enrollments::router())
        .nest("/instructor", api::instructor::router())
        .layer(session_layer);

    let router = Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .with_state(state);
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let database = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&database).await.unwrap();
        build_router(AppState::new(database, Config::default()))
            .await
            .unwrap()
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, set_cookie, body)
    }

    async fn login_as(router: &Router, email: &str, role: &str) -> String {
        let (status, _, _) = send(
            router,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": email, "email": email, "password": "pw", "role": role })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, cookie, _) = send(
            router,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        cookie.expect("login should set a session cookie")
    }

    /// Drive the whole enrollment flow over HTTP: instructor publishes a
    /// one-section course with a lecture and a quiz, student enrolls,
    /// completes the lecture, and passes the quiz.
    #[tokio::test]
    async fn enrollment_flow_over_http() {
        let router = test_router().await;
        let instructor = login_as(&router, "grace@example.com", "instructor").await;

        let (status, _, body) = send(
            &router,
            "POST",
            "/api/instructor/courses",
            Some(&instructor),
            Some(json!({ "title": "Rust Basics", "is_published": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let course_id = body["id"].as_i64().unwrap();

        let (status, _, body) = send(
            &router,
            "POST",
            &format!("/api/instructor/courses/{course_id}/sections"),
            Some(&instructor),
            Some(json!({ "title": "Intro" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let section_id = body["id"].as_i64().unwrap();

        let (status, _, body) = send(
            &router,
            "POST",
            &format!("/api/instructor/sections/{section_id}/lectures"),
            Some(&instructor),
            Some(json!({ "title": "Hello", "duration_secs": 60 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let lecture_id = body["id"].as_i64().unwrap();

        let (status, _, _) = send(
            &router,
            "PUT",
            &format!("/api/instructor/sections/{section_id}/quiz"),
            Some(&instructor),
            Some(json!({
                "passing_score": 50,
                "questions": [{
                    "prompt": "2 + 2?",
                    "options": [
                        { "text": "4", "is_correct": true },
                        { "text": "5", "is_correct": false }
                    ]
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let student = login_as(&router, "ada@example.com", "student").await;

        let (status, _, body) = send(
            &router,
            "GET",
            &format!("/api/enrollments/{course_id}"),
            Some(&student),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enrolled"], json!(false));

        let (status, _, _) = send(
            &router,
            "POST",
            &format!("/api/courses/{course_id}/enroll"),
            Some(&student),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(
            &router,
            "POST",
            &format!("/api/enrollments/{course_id}/lectures/{lecture_id}/complete"),
            Some(&student),
            Some(json!({ "watch_time": 55 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enrollment"]["progress"], json!(50));

        let (status, _, body) = send(
            &router,
            "POST",
            &format!("/api/enrollments/{course_id}/sections/{section_id}/quiz"),
            Some(&student),
            Some(json!({ "answers": [0] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], json!(100));
        assert_eq!(body["passed"], json!(true));
        assert_eq!(body["is_retake"], json!(false));
        assert_eq!(body["enrollment"]["is_completed"], json!(true));
        assert_eq!(body["enrollment"]["progress"], json!(100));

        // The viewer resumes at the top once the course is finished.
        let (status, _, body) = send(
            &router,
            "GET",
            &format!("/api/enrollments/{course_id}/resume"),
            Some(&student),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["position"]["kind"], json!("lecture"));
        assert_eq!(body["position"]["section"], json!(0));
    }

    #[tokio::test]
    async fn role_and_auth_gating() {
        let router = test_router().await;
        let (status, _, _) = send(&router, "GET", "/api/enrollments/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let student = login_as(&router, "ada@example.com", "student").await;
        let (status, _, _) = send(
            &router,
            "POST",
            "/api/instructor/courses",
            Some(&student),
            Some(json!({ "title": "Nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // The catalog is public.
        let (status, _, _) = send(&router, "GET", "/api/courses/", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_quiz_submission_is_a_400() {
        let router = test_router().await;
        let instructor = login_as(&router, "grace@example.com", "instructor").await;
        let (_, _, body) = send(
            &router,
            "POST",
            "/api/instructor/courses",
            Some(&instructor),
            Some(json!({ "title": "T", "is_published": true })),
        )
        .await;
        let course_id = body["id"].as_i64().unwrap();
        let (_, _, body) = send(
            &router,
            "POST",
            &format!("/api/instructor/courses/{course_id}/sections"),
            Some(&instructor),
            Some(json!({ "title": "S" })),
        )
        .await;
        let section_id = body["id"].as_i64().unwrap();
        send(
            &router,
            "PUT",
            &format!("/api/instructor/sections/{section_id}/quiz"),
            Some(&instructor),
            Some(json!({
                "passing_score": 50,
                "questions": [{
                    "prompt": "Q",
                    "options": [
                        { "text": "A", "is_correct": true },
                        { "text": "B", "is_correct": false }
                    ]
                }]
            })),
        )
        .await;

        let student = login_as(&router, "ada@example.com", "student").await;
        send(
            &router,
            "POST",
            &format!("/api/courses/{course_id}/enroll"),
            Some(&student),
            None,
        )
        .await;
        let (status, _, _) = send(
            &router,
            "POST",
            &format!("/api/enrollments/{course_id}/sections/{section_id}/quiz"),
            Some(&student),
            Some(json!({ "answers": [0, 1] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
