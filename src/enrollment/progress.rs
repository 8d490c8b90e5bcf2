use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::course::content::CourseContent;

/// Per-lecture completion record. Absence of a record means not started.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct LectureProgress {
    pub lecture_id: i64,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub watch_time_secs: i64,
}

/// The single current attempt for one section's quiz. Retakes overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizAttempt {
    pub section_id: i64,
    /// Submitted option index per question, `null` = unanswered.
    pub answers: Vec<Option<i64>>,
    pub score: i64,
    pub passed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub attempted_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
    /// Derived by [`ProgressCounts`]; never taken from the client.
    pub progress: i64,
    pub is_completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub lecture_progress: Vec<LectureProgress>,
    pub quiz_attempts: Vec<QuizAttempt>,
}

impl Enrollment {
    pub fn lecture_completed(&self, lecture_id: i64) -> bool {
        self.lecture_progress
            .iter()
            .any(|lp| lp.lecture_id == lecture_id && lp.completed)
    }

    pub fn attempt_for(&self, section_id: i64) -> Option<&QuizAttempt> {
        self.quiz_attempts.iter().find(|qa| qa.section_id == section_id)
    }

    pub fn quiz_passed(&self, section_id: i64) -> bool {
        self.attempt_for(section_id).is_some_and(|qa| qa.passed)
    }
}

/// Aggregate progress over the course's *current* content tree. Records
/// referencing deleted lectures or sections still exist in storage but are
/// excluded here, so progress can only reflect content that is really there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCounts {
    pub completed_lectures: usize,
    pub total_lectures: usize,
    pub passed_quizzes: usize,
    pub quiz_sections: usize,
}

impl ProgressCounts {
    pub fn tally(course: &CourseContent, enrollment: &Enrollment) -> Self {
        let mut completed_lectures = 0;
        let mut passed_quizzes = 0;
        for section in &course.sections {
            for lecture in &section.lectures {
                if enrollment.lecture_completed(lecture.id) {
                    completed_lectures += 1;
                }
            }
            if section.has_quiz() && enrollment.quiz_passed(section.id) {
                passed_quizzes += 1;
            }
        }
        Self {
            completed_lectures,
            total_lectures: course.total_lectures(),
            passed_quizzes,
            quiz_sections: course.quiz_section_count(),
        }
    }

    /// Lectures and quizzes weigh equally, one unit each. A course with no
    /// content at all reports 0, not 100.
    pub fn percent(&self) -> i64 {
        let denominator = self.total_lectures + self.quiz_sections;
        if denominator == 0 {
            return 0;
        }
        let numerator = self.completed_lectures + self.passed_quizzes;
        ((100 * numerator) as f64 / denominator as f64).round() as i64
    }

    /// Complete means every current lecture watched and every current quiz
    /// passed. An empty course never completes on its own.
    pub fn is_complete(&self) -> bool {
        let denominator = self.total_lectures + self.quiz_sections;
        denominator > 0
            && self.completed_lectures == self.total_lectures
            && self.passed_quizzes == self.quiz_sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(l: usize, total_l: usize, q: usize, total_q: usize) -> ProgressCounts {
        ProgressCounts {
            completed_lectures: l,
            total_lectures: total_l,
            passed_quizzes: q,
            quiz_sections: total_q,
        }
    }

    #[test]
    fn percent_weighs_lectures_and_quizzes_equally() {
        assert_eq!(counts(0, 2, 0, 2).percent(), 0);
        assert_eq!(counts(2, 2, 0, 2).percent(), 50);
        assert_eq!(counts(2, 2, 1, 2).percent(), 75);
        assert_eq!(counts(2, 2, 2, 2).percent(), 100);
    }

    #[test]
    fn percent_rounds_half_up() {
        // 1 of 3 units = 33.33 -> 33; 2 of 3 = 66.67 -> 67
        assert_eq!(counts(1, 3, 0, 0).percent(), 33);
        assert_eq!(counts(2, 3, 0, 0).percent(), 67);
        // 1 of 8 = 12.5 rounds to 13
        assert_eq!(counts(1, 8, 0, 0).percent(), 13);
    }

    #[test]
    fn empty_course_reports_zero_and_never_completes() {
        let c = counts(0, 0, 0, 0);
        assert_eq!(c.percent(), 0);
        assert!(!c.is_complete());
    }

    #[test]
    fn complete_requires_both_dimensions() {
        assert!(!counts(2, 2, 1, 2).is_complete());
        assert!(!counts(1, 2, 2, 2).is_complete());
        assert!(counts(2, 2, 2, 2).is_complete());
        assert!(counts(2, 2, 0, 0).is_complete());
    }
}
