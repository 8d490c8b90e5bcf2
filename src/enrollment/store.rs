use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;
use utoipa::ToSchema;

use super::grader::{self, GradeOutcome};
use super::progress::{Enrollment, LectureProgress, ProgressCounts, QuizAttempt};
use crate::course::catalog::Catalog;
use crate::course::content::{CourseContent, CourseSummary};
use crate::error::Error;
use crate::utils::now_local;

/// Enrollment persistence plus the two mutations that drive progress:
/// lecture completion and quiz submission. Every query is scoped by the
/// acting student's id, so one student can never touch another's state.
#[derive(Debug, Clone)]
pub struct EnrollmentStore {
    pub database: SqlitePool,
    pub catalog: Catalog,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentWithCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseSummary,
}

/// Wire response for a graded submission. The updated enrollment is always
/// included so the client never reconstructs derived state on its own.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizSubmission {
    #[serde(flatten)]
    pub outcome: GradeOutcome,
    pub is_retake: bool,
    pub enrollment: Enrollment,
}

#[derive(sqlx::FromRow)]
struct EnrollmentRow {
    id: i64,
    student_id: i64,
    course_id: i64,
    enrolled_at: time::OffsetDateTime,
    progress: i64,
    is_completed: bool,
    completed_at: Option<time::OffsetDateTime>,
}

impl EnrollmentStore {
    pub fn new(database: SqlitePool) -> Self {
        let catalog = Catalog::new(database.clone());
        Self { database, catalog }
    }

    /// One enrollment per (student, course); enrolling twice is an error the
    /// client surfaces as "already enrolled".
    pub async fn enroll(&self, student_id: i64, course_id: i64) -> Result<Enrollment, Error> {
        let course = self.catalog.get_summary(course_id).await?;
        if !course.is_published {
            return Err(Error::NotFound("course"));
        }
        let now = now_local();
        let result = sqlx::query(
            "INSERT INTO enrollment (student_id, course_id, enrolled_at) VALUES (?, ?, ?)",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(now)
        .execute(&self.database)
        .await;
        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(Error::validation("already enrolled in this course"));
            }
            Err(e) => return Err(e.into()),
        }
        info!("student {student_id} enrolled in course {course_id}");
        self.require(student_id, course_id).await
    }

    pub async fn get(&self, student_id: i64, course_id: i64) -> Result<Option<Enrollment>, Error> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT id, student_id, course_id, enrolled_at, progress, is_completed, completed_at
             FROM enrollment WHERE student_id = ? AND course_id = ?",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.database)
        .await?;
        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, student_id: i64) -> Result<Vec<EnrollmentWithCourse>, Error> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT id, student_id, course_id, enrolled_at, progress, is_completed, completed_at
             FROM enrollment WHERE student_id = ? ORDER BY enrolled_at DESC",
        )
        .bind(student_id)
        .fetch_all(&self.database)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            // Enrollments referencing a deleted course are skipped, the same
            // filtering the course list applies.
            let Ok(course) = self.catalog.get_summary(row.course_id).await else {
                continue;
            };
            out.push(EnrollmentWithCourse {
                enrollment: self.assemble(row).await?,
                course,
            });
        }
        Ok(out)
    }

    /// Mark one lecture watched. Idempotent: repeat calls keep the completion
    /// flag and the first completion timestamp, and watch time never regresses
    /// on a shorter re-watch.
    pub async fn mark_lecture_complete(
        &self,
        student_id: i64,
        course_id: i64,
        lecture_id: i64,
        watch_time_secs: i64,
    ) -> Result<Enrollment, Error> {
        if watch_time_secs < 0 {
            return Err(Error::validation("watch time must be a non-negative integer"));
        }
        let enrollment = self.require(student_id, course_id).await?;
        let course = self.catalog.get_course(course_id).await?;
        if !course.contains_lecture(lecture_id) {
            return Err(Error::NotFound("lecture"));
        }

        let now = now_local();
        let mut tx = self.database.begin().await?;
        sqlx::query(
            "INSERT INTO lecture_progress
                 (enrollment_id, lecture_id, completed, completed_at, watch_time_secs)
             VALUES (?, ?, 1, ?, ?)
             ON CONFLICT (enrollment_id, lecture_id) DO UPDATE SET
                 completed = 1,
                 completed_at = COALESCE(completed_at, excluded.completed_at),
                 watch_time_secs = MAX(watch_time_secs, excluded.watch_time_secs)",
        )
        .bind(enrollment.id)
        .bind(lecture_id)
        .bind(now)
        .bind(watch_time_secs)
        .execute(&mut *tx)
        .await?;
        self.store_derived(&mut tx, &course, &enrollment).await?;
        tx.commit().await?;

        self.require(student_id, course_id).await
    }

    /// Grade a submission and upsert the section's current attempt. All
    /// validation happens before any write, so a rejected submission leaves
    /// the previous attempt untouched.
    pub async fn submit_quiz(
        &self,
        student_id: i64,
        course_id: i64,
        section_id: i64,
        answers: Vec<Option<i64>>,
    ) -> Result<QuizSubmission, Error> {
        let enrollment = self.require(student_id, course_id).await?;
        let course = self.catalog.get_course(course_id).await?;
        let section = course.section(section_id).ok_or(Error::NotFound("section"))?;
        let quiz = match &section.quiz {
            Some(quiz) if !quiz.questions.is_empty() => quiz,
            _ => return Err(Error::NotFound("quiz")),
        };
        let outcome = grader::grade(quiz, &answers)?;
        let is_retake = enrollment.attempt_for(section_id).is_some();

        let answers_json = serde_json::to_string(&answers)
            .map_err(|e| anyhow::anyhow!("failed to encode answers: {e}"))?;
        let now = now_local();
        let mut tx = self.database.begin().await?;
        sqlx::query(
            "INSERT INTO quiz_attempt
                 (enrollment_id, section_id, answers, score, passed, attempted_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (enrollment_id, section_id) DO UPDATE SET
                 answers = excluded.answers,
                 score = excluded.score,
                 passed = excluded.passed,
                 attempted_at = excluded.attempted_at",
        )
        .bind(enrollment.id)
        .bind(section_id)
        .bind(answers_json)
        .bind(outcome.score)
        .bind(outcome.passed)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        self.store_derived(&mut tx, &course, &enrollment).await?;
        tx.commit().await?;

        info!(
            "student {student_id} submitted quiz for section {section_id}: \
             score {} passed {} retake {is_retake}",
            outcome.score, outcome.passed
        );
        let enrollment = self.require(student_id, course_id).await?;
        Ok(QuizSubmission {
            outcome,
            is_retake,
            enrollment,
        })
    }

    async fn require(&self, student_id: i64, course_id: i64) -> Result<Enrollment, Error> {
        self.get(student_id, course_id)
            .await?
            .ok_or(Error::NotFound("enrollment"))
    }

    /// Recompute `progress` / `is_completed` from the sub-records inside the
    /// caller's transaction. Completion is latched: once an enrollment has
    /// completed, later content edits can lower the raw counts but never the
    /// stored state, and progress stays pinned at 100.
    async fn store_derived(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        course: &CourseContent,
        enrollment: &Enrollment,
    ) -> Result<(), Error> {
        let lecture_progress = load_lecture_progress(&mut **tx, enrollment.id).await?;
        let quiz_attempts = load_quiz_attempts(&mut **tx, enrollment.id).await?;
        let current = Enrollment {
            lecture_progress,
            quiz_attempts,
            ..enrollment.clone()
        };
        let counts = ProgressCounts::tally(course, &current);

        let (progress, is_completed) = if enrollment.is_completed {
            (100, true)
        } else {
            (counts.percent(), counts.is_complete())
        };
        let completed_at = match (enrollment.is_completed, is_completed) {
            (false, true) => Some(now_local()),
            _ => enrollment.completed_at,
        };
        if is_completed && !enrollment.is_completed {
            info!("enrollment {} completed course {}", enrollment.id, course.summary.id);
        }
        sqlx::query(
            "UPDATE enrollment SET progress = ?, is_completed = ?, completed_at = ? WHERE id = ?",
        )
        .bind(if is_completed { 100 } else { progress })
        .bind(is_completed)
        .bind(completed_at)
        .bind(enrollment.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn assemble(&self, row: EnrollmentRow) -> Result<Enrollment, Error> {
        let lecture_progress = load_lecture_progress(&self.database, row.id).await?;
        let quiz_attempts = load_quiz_attempts(&self.database, row.id).await?;
        Ok(Enrollment {
            id: row.id,
            student_id: row.student_id,
            course_id: row.course_id,
            enrolled_at: row.enrolled_at,
            progress: row.progress,
            is_completed: row.is_completed,
            completed_at: row.completed_at,
            lecture_progress,
            quiz_attempts,
        })
    }
}

async fn load_lecture_progress<'e, E>(executor: E, enrollment_id: i64) -> Result<Vec<LectureProgress>, Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, LectureProgress>(
        "SELECT lecture_id, completed, completed_at, watch_time_secs
         FROM lecture_progress WHERE enrollment_id = ? ORDER BY lecture_id",
    )
    .bind(enrollment_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

async fn load_quiz_attempts<'e, E>(executor: E, enrollment_id: i64) -> Result<Vec<QuizAttempt>, Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(i64, String, i64, bool, time::OffsetDateTime)> = sqlx::query_as(
        "SELECT section_id, answers, score, passed, attempted_at
         FROM quiz_attempt WHERE enrollment_id = ? ORDER BY section_id",
    )
    .bind(enrollment_id)
    .fetch_all(executor)
    .await?;
    let mut attempts = Vec::with_capacity(rows.len());
    for (section_id, answers, score, passed, attempted_at) in rows {
        let answers: Vec<Option<i64>> = serde_json::from_str(&answers)
            .map_err(|e| anyhow::anyhow!("corrupt answers for section {section_id}: {e}"))?;
        attempts.push(QuizAttempt {
            section_id,
            answers,
            score,
            passed,
            attempted_at,
        });
    }
    Ok(attempts)
}
