use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Catalog listing entry, without the section tree.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct CourseSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructor_id: i64,
    pub is_published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The full content tree of one course. Loaded as a unit: progress math and
/// navigation both need the whole document-ordered structure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseContent {
    #[serde(flatten)]
    pub summary: CourseSummary,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Section {
    pub id: i64,
    pub title: String,
    pub lectures: Vec<Lecture>,
    pub quiz: Option<Quiz>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Lecture {
    pub id: i64,
    pub title: String,
    pub video_url: String,
    pub duration_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Quiz {
    pub passing_score: i64,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub id: i64,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnswerOption {
    pub text: String,
    pub is_correct: bool,
}

impl Question {
    /// Index of the option flagged correct. Content writes enforce exactly
    /// one, so `None` only occurs for rows predating that check.
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| o.is_correct)
    }
}

impl Section {
    /// A section "has a quiz" only when the quiz carries questions.
    pub fn has_quiz(&self) -> bool {
        self.quiz
            .as_ref()
            .is_some_and(|q| !q.questions.is_empty())
    }
}

impl CourseContent {
    pub fn total_lectures(&self) -> usize {
        self.sections.iter().map(|s| s.lectures.len()).sum()
    }

    pub fn quiz_section_count(&self) -> usize {
        self.sections.iter().filter(|s| s.has_quiz()).count()
    }

    pub fn section(&self, section_id: i64) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn contains_lecture(&self, lecture_id: i64) -> bool {
        self.sections
            .iter()
            .any(|s| s.lectures.iter().any(|l| l.id == lecture_id))
    }
}

/// Student-facing view of a question: the correct flags are stripped so the
/// answer key never leaves the server.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub id: i64,
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicQuiz {
    pub passing_score: i64,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicSection {
    pub id: i64,
    pub title: String,
    pub lectures: Vec<Lecture>,
    pub quiz: Option<PublicQuiz>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicCourse {
    #[serde(flatten)]
    pub summary: CourseSummary,
    pub sections: Vec<PublicSection>,
}

impl From<CourseContent> for PublicCourse {
    fn from(course: CourseContent) -> Self {
        let sections = course
            .sections
            .into_iter()
            .map(|s| {
                let quiz = s.quiz.filter(|q| !q.questions.is_empty()).map(|q| PublicQuiz {
                    passing_score: q.passing_score,
                    questions: q
                        .questions
                        .into_iter()
                        .map(|question| PublicQuestion {
                            id: question.id,
                            prompt: question.prompt,
                            options: question.options.into_iter().map(|o| o.text).collect(),
                        })
                        .collect(),
                });
                PublicSection {
                    id: s.id,
                    title: s.title,
                    lectures: s.lectures,
                    quiz,
                }
            })
            .collect();
        Self {
            summary: course.summary,
            sections,
        }
    }
}
