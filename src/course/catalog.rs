use std::collections::HashMap;

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

use super::content::{
    AnswerOption, CourseContent, CourseSummary, Lecture, Question, Quiz, Section,
};
use crate::error::Error;
use crate::utils::now_local;

/// All course content lives behind the catalog. Reads assemble the full
/// section/lecture/quiz tree; writes are instructor-gated by ownership.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub database: SqlitePool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CourseSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SectionSpec {
    pub title: String,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LectureSpec {
    pub title: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub duration_secs: i64,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuestionSpec {
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuizSpec {
    pub passing_score: i64,
    pub questions: Vec<QuestionSpec>,
}

impl Catalog {
    pub fn new(database: SqlitePool) -> Self {
        Self { database }
    }

    pub async fn list_published(&self) -> Result<Vec<CourseSummary>, Error> {
        let courses = sqlx::query_as::<_, CourseSummary>(
            "SELECT id, title, description, instructor_id, is_published, created_at
             FROM course WHERE is_published = 1 ORDER BY created_at DESC",
        )
        .fetch_all(&self.database)
        .await?;
        Ok(courses)
    }

    pub async fn get_summary(&self, course_id: i64) -> Result<CourseSummary, Error> {
        sqlx::query_as::<_, CourseSummary>(
            "SELECT id, title, description, instructor_id, is_published, created_at
             FROM course WHERE id = ?",
        )
        .bind(course_id)
        .fetch_optional(&self.database)
        .await?
        .ok_or(Error::NotFound("course"))
    }

    /// Load the full content tree for a course in document order.
    pub async fn get_course(&self, course_id: i64) -> Result<CourseContent, Error> {
        let summary = self.get_summary(course_id).await?;

        let section_rows: Vec<(i64, String, Option<i64>)> = sqlx::query_as(
            "SELECT id, title, quiz_passing_score FROM section
             WHERE course_id = ? ORDER BY position, id",
        )
        .bind(course_id)
        .fetch_all(&self.database)
        .await?;

        let mut sections = Vec::with_capacity(section_rows.len());
        let mut index_of = HashMap::new();
        for (id, title, passing_score) in section_rows {
            index_of.insert(id, sections.len());
            sections.push((
                Section {
                    id,
                    title,
                    lectures: Vec::new(),
                    quiz: None,
                },
                passing_score,
            ));
        }

        let lecture_rows: Vec<(i64, i64, String, String, i64)> = sqlx::query_as(
            "SELECT lecture.id, lecture.section_id, lecture.title, lecture.video_url,
                    lecture.duration_secs
             FROM lecture JOIN section ON lecture.section_id = section.id
             WHERE section.course_id = ? ORDER BY lecture.position, lecture.id",
        )
        .bind(course_id)
        .fetch_all(&self.database)
        .await?;
        for (id, section_id, title, video_url, duration_secs) in lecture_rows {
            if let Some(&i) = index_of.get(&section_id) {
                sections[i].0.lectures.push(Lecture {
                    id,
                    title,
                    video_url,
                    duration_secs,
                });
            }
        }

        let question_rows: Vec<(i64, i64, String, String)> = sqlx::query_as(
            "SELECT quiz_question.id, quiz_question.section_id, quiz_question.prompt,
                    quiz_question.options
             FROM quiz_question JOIN section ON quiz_question.section_id = section.id
             WHERE section.course_id = ? ORDER BY quiz_question.position, quiz_question.id",
        )
        .bind(course_id)
        .fetch_all(&self.database)
        .await?;
        for (id, section_id, prompt, options) in question_rows {
            let Some(&i) = index_of.get(&section_id) else {
                continue;
            };
            let options: Vec<AnswerOption> = serde_json::from_str(&options)
                .map_err(|e| anyhow::anyhow!("corrupt options for question {id}: {e}"))?;
            let (section, passing_score) = &mut sections[i];
            section
                .quiz
                .get_or_insert_with(|| Quiz {
                    // A quiz row without a stored threshold falls back to
                    // all-or-nothing.
                    passing_score: passing_score.unwrap_or(100),
                    questions: Vec::new(),
                })
                .questions
                .push(Question {
                    id,
                    prompt,
                    options,
                });
        }

        Ok(CourseContent {
            summary,
            sections: sections.into_iter().map(|(s, _)| s).collect(),
        })
    }

    pub async fn create_course(
        &self,
        instructor_id: i64,
        spec: CourseSpec,
    ) -> Result<i64, Error> {
        if spec.title.trim().is_empty() {
            return Err(Error::validation("course title must not be empty"));
        }
        let now = now_local();
        let result = sqlx::query(
            "INSERT INTO course (title, description, instructor_id, is_published, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(spec.title)
        .bind(spec.description)
        .bind(instructor_id)
        .bind(spec.is_published)
        .bind(now)
        .execute(&self.database)
        .await?;
        let id = result.last_insert_rowid();
        info!("course {id} created by instructor {instructor_id}");
        Ok(id)
    }

    pub async fn update_course(
        &self,
        instructor_id: i64,
        course_id: i64,
        spec: CourseSpec,
    ) -> Result<(), Error> {
        self.require_owner(instructor_id, course_id).await?;
        if spec.title.trim().is_empty() {
            return Err(Error::validation("course title must not be empty"));
        }
        sqlx::query("UPDATE course SET title = ?, description = ?, is_published = ? WHERE id = ?")
            .bind(spec.title)
            .bind(spec.description)
            .bind(spec.is_published)
            .bind(course_id)
            .execute(&self.database)
            .await?;
        Ok(())
    }

    pub async fn delete_course(&self, instructor_id: i64, course_id: i64) -> Result<(), Error> {
        self.require_owner(instructor_id, course_id).await?;
        sqlx::query("DELETE FROM course WHERE id = ?")
            .bind(course_id)
            .execute(&self.database)
            .await?;
        info!("course {course_id} deleted by instructor {instructor_id}");
        Ok(())
    }

    pub async fn add_section(
        &self,
        instructor_id: i64,
        course_id: i64,
        spec: SectionSpec,
    ) -> Result<i64, Error> {
        self.require_owner(instructor_id, course_id).await?;
        let result = sqlx::query("INSERT INTO section (course_id, title, position) VALUES (?, ?, ?)")
            .bind(course_id)
            .bind(spec.title)
            .bind(spec.position)
            .execute(&self.database)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_section(
        &self,
        instructor_id: i64,
        section_id: i64,
        spec: SectionSpec,
    ) -> Result<(), Error> {
        let course_id = self.section_course(section_id).await?;
        self.require_owner(instructor_id, course_id).await?;
        sqlx::query("UPDATE section SET title = ?, position = ? WHERE id = ?")
            .bind(spec.title)
            .bind(spec.position)
            .bind(section_id)
            .execute(&self.database)
            .await?;
        Ok(())
    }

    pub async fn delete_section(&self, instructor_id: i64, section_id: i64) -> Result<(), Error> {
        let course_id = self.section_course(section_id).await?;
        self.require_owner(instructor_id, course_id).await?;
        sqlx::query("DELETE FROM section WHERE id = ?")
            .bind(section_id)
            .execute(&self.database)
            .await?;
        Ok(())
    }

    pub async fn add_lecture(
        &self,
        instructor_id: i64,
        section_id: i64,
        spec: LectureSpec,
    ) -> Result<i64, Error> {
        let course_id = self.section_course(section_id).await?;
        self.require_owner(instructor_id, course_id).await?;
        let result = sqlx::query(
            "INSERT INTO lecture (section_id, title, video_url, duration_secs, position)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(section_id)
        .bind(spec.title)
        .bind(spec.video_url)
        .bind(spec.duration_secs)
        .bind(spec.position)
        .execute(&self.database)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_lecture(
        &self,
        instructor_id: i64,
        lecture_id: i64,
        spec: LectureSpec,
    ) -> Result<(), Error> {
        let course_id = self.lecture_course(lecture_id).await?;
        self.require_owner(instructor_id, course_id).await?;
        sqlx::query(
            "UPDATE lecture SET title = ?, video_url = ?, duration_secs = ?, position = ?
             WHERE id = ?",
        )
        .bind(spec.title)
        .bind(spec.video_url)
        .bind(spec.duration_secs)
        .bind(spec.position)
        .bind(lecture_id)
        .execute(&self.database)
        .await?;
        Ok(())
    }

    pub async fn delete_lecture(&self, instructor_id: i64, lecture_id: i64) -> Result<(), Error> {
        let course_id = self.lecture_course(lecture_id).await?;
        self.require_owner(instructor_id, course_id).await?;
        sqlx::query("DELETE FROM lecture WHERE id = ?")
            .bind(lecture_id)
            .execute(&self.database)
            .await?;
        Ok(())
    }

    /// Replace a section's quiz wholesale. Every question must carry exactly
    /// one correct option; the threshold must be a percentage.
    pub async fn set_quiz(
        &self,
        instructor_id: i64,
        section_id: i64,
        spec: QuizSpec,
    ) -> Result<(), Error> {
        let course_id = self.section_course(section_id).await?;
        self.require_owner(instructor_id, course_id).await?;
        if !(0..=100).contains(&spec.passing_score) {
            return Err(Error::validation("passing score must be between 0 and 100"));
        }
        if spec.questions.is_empty() {
            return Err(Error::validation("a quiz needs at least one question"));
        }
        for (i, question) in spec.questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(Error::validation(format!(
                    "question {} needs at least two options",
                    i + 1
                )));
            }
            let correct = question.options.iter().filter(|o| o.is_correct).count();
            if correct != 1 {
                return Err(Error::validation(format!(
                    "question {} must have exactly one correct option",
                    i + 1
                )));
            }
        }

        let mut tx = self.database.begin().await?;
        sqlx::query("UPDATE section SET quiz_passing_score = ? WHERE id = ?")
            .bind(spec.passing_score)
            .bind(section_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM quiz_question WHERE section_id = ?")
            .bind(section_id)
            .execute(&mut *tx)
            .await?;
        for (position, question) in spec.questions.into_iter().enumerate() {
            let options = serde_json::to_string(&question.options)
                .map_err(|e| anyhow::anyhow!("failed to encode options: {e}"))?;
            sqlx::query(
                "INSERT INTO quiz_question (section_id, prompt, options, position)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(section_id)
            .bind(question.prompt)
            .bind(options)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_quiz(&self, instructor_id: i64, section_id: i64) -> Result<(), Error> {
        let course_id = self.section_course(section_id).await?;
        self.require_owner(instructor_id, course_id).await?;
        let mut tx = self.database.begin().await?;
        sqlx::query("UPDATE section SET quiz_passing_score = NULL WHERE id = ?")
            .bind(section_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM quiz_question WHERE section_id = ?")
            .bind(section_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn require_owner(&self, instructor_id: i64, course_id: i64) -> Result<(), Error> {
        let owner: Option<i64> = sqlx::query_scalar("SELECT instructor_id FROM course WHERE id = ?")
            .bind(course_id)
            .fetch_optional(&self.database)
            .await?;
        match owner {
            None => Err(Error::NotFound("course")),
            Some(owner) if owner != instructor_id => {
                Err(Error::Forbidden("not the course instructor".into()))
            }
            Some(_) => Ok(()),
        }
    }

    async fn section_course(&self, section_id: i64) -> Result<i64, Error> {
        sqlx::query_scalar("SELECT course_id FROM section WHERE id = ?")
            .bind(section_id)
            .fetch_optional(&self.database)
            .await?
            .ok_or(Error::NotFound("section"))
    }

    async fn lecture_course(&self, lecture_id: i64) -> Result<i64, Error> {
        sqlx::query_scalar(
            "SELECT section.course_id FROM lecture
             JOIN section ON lecture.section_id = section.id WHERE lecture.id = ?",
        )
        .bind(lecture_id)
        .fetch_optional(&self.database)
        .await?
        .ok_or(Error::NotFound("lecture"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::user::{Role, create_user};

    pub async fn test_pool() -> SqlitePool {
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

    pub async fn test_instructor(db: &SqlitePool) -> i64 {
        create_user(
            db,
            "Grace".into(),
            format!("grace-{}@example.com", rand_suffix()),
            "teach".into(),
            Role::Instructor,
        )
        .await
        .unwrap()
    }

    fn rand_suffix() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }

    pub fn two_options(correct_first: bool) -> Vec<AnswerOption> {
        vec![
            AnswerOption {
                text: "A".into(),
                is_correct: correct_first,
            },
            AnswerOption {
                text: "B".into(),
                is_correct: !correct_first,
            },
        ]
    }

    /// Two sections, one lecture each, two-question quiz per section with a
    /// 50% threshold. Correct answer is option 0 for every question.
    pub async fn seed_course(catalog: &Catalog, instructor_id: i64) -> i64 {
        let course_id = catalog
            .create_course(
                instructor_id,
                CourseSpec {
                    title: "Rust Basics".into(),
                    description: "".into(),
                    is_published: true,
                },
            )
            .await
            .unwrap();
        for n in 1..=2 {
            let section_id = catalog
                .add_section(
                    instructor_id,
                    course_id,
                    SectionSpec {
                        title: format!("Section {n}"),
                        position: n,
                    },
                )
                .await
                .unwrap();
            catalog
                .add_lecture(
                    instructor_id,
                    section_id,
                    LectureSpec {
                        title: format!("Lecture {n}"),
                        video_url: "".into(),
                        duration_secs: 60,
                        position: 0,
                    },
                )
                .await
                .unwrap();
            catalog
                .set_quiz(
                    instructor_id,
                    section_id,
                    QuizSpec {
                        passing_score: 50,
                        questions: vec![
                            QuestionSpec {
                                prompt: "Q1".into(),
                                options: two_options(true),
                            },
                            QuestionSpec {
                                prompt: "Q2".into(),
                                options: two_options(true),
                            },
                        ],
                    },
                )
                .await
                .unwrap();
        }
        course_id
    }

    #[tokio::test]
    async fn course_tree_roundtrip() {
        let db = test_pool().await;
        let catalog = Catalog::new(db.clone());
        let instructor = test_instructor(&db).await;
        let course_id = seed_course(&catalog, instructor).await;

        let course = catalog.get_course(course_id).await.unwrap();
        assert_eq!(course.sections.len(), 2);
        assert_eq!(course.total_lectures(), 2);
        assert_eq!(course.quiz_section_count(), 2);
        let quiz = course.sections[0].quiz.as_ref().unwrap();
        assert_eq!(quiz.passing_score, 50);
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.questions[0].correct_index(), Some(0));
    }

    #[tokio::test]
    async fn quiz_requires_exactly_one_correct_option() {
        let db = test_pool().await;
        let catalog = Catalog::new(db.clone());
        let instructor = test_instructor(&db).await;
        let course_id = catalog
            .create_course(
                instructor,
                CourseSpec {
                    title: "T".into(),
                    description: "".into(),
                    is_published: false,
                },
            )
            .await
            .unwrap();
        let section_id = catalog
            .add_section(
                instructor,
                course_id,
                SectionSpec {
                    title: "S".into(),
                    position: 0,
                },
            )
            .await
            .unwrap();
        let err = catalog
            .set_quiz(
                instructor,
                section_id,
                QuizSpec {
                    passing_score: 50,
                    questions: vec![QuestionSpec {
                        prompt: "Q".into(),
                        options: vec![
                            AnswerOption {
                                text: "A".into(),
                                is_correct: true,
                            },
                            AnswerOption {
                                text: "B".into(),
                                is_correct: true,
                            },
                        ],
                    }],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn ownership_is_enforced() {
        let db = test_pool().await;
        let catalog = Catalog::new(db.clone());
        let owner = test_instructor(&db).await;
        let other = test_instructor(&db).await;
        let course_id = seed_course(&catalog, owner).await;
        let err = catalog.delete_course(other, course_id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}
