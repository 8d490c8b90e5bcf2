use serde::Serialize;
use utoipa::ToSchema;

use crate::course::content::Quiz;
use crate::error::Error;

/// Result of scoring one submission against a quiz definition.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GradeOutcome {
    pub score: i64,
    pub passed: bool,
    pub correct_answers: usize,
    pub total_questions: usize,
}

/// Score a submitted answer set. The submission must carry one entry per
/// question; `None` means the student left the question unanswered and
/// grades as incorrect. Client-side validation blocks incomplete forms,
/// but the submission is checked again here.
pub fn grade(quiz: &Quiz, answers: &[Option<i64>]) -> Result<GradeOutcome, Error> {
    let total_questions = quiz.questions.len();
    if answers.len() != total_questions {
        return Err(Error::validation(
            "answers must match the number of quiz questions",
        ));
    }
    for (i, (answer, question)) in answers.iter().zip(&quiz.questions).enumerate() {
        if let Some(selected) = answer {
            if *selected < 0 || *selected as usize >= question.options.len() {
                return Err(Error::validation(format!(
                    "invalid answer for question {}",
                    i + 1
                )));
            }
        }
    }

    let correct_answers = answers
        .iter()
        .zip(&quiz.questions)
        .filter(|(answer, question)| {
            answer.is_some_and(|selected| {
                question.correct_index() == Some(selected as usize)
            })
        })
        .count();
    let score = if total_questions == 0 {
        0
    } else {
        ((100 * correct_answers) as f64 / total_questions as f64).round() as i64
    };
    Ok(GradeOutcome {
        score,
        passed: score >= quiz.passing_score,
        correct_answers,
        total_questions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::content::{AnswerOption, Question};

    fn quiz(passing_score: i64, correct: &[usize], option_count: usize) -> Quiz {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, &correct_index)| Question {
                id: i as i64 + 1,
                prompt: format!("Q{}", i + 1),
                options: (0..option_count)
                    .map(|o| AnswerOption {
                        text: format!("opt {o}"),
                        is_correct: o == correct_index,
                    })
                    .collect(),
            })
            .collect();
        Quiz {
            passing_score,
            questions,
        }
    }

    #[test]
    fn scores_partially_correct_submission() {
        let quiz = quiz(50, &[0, 1, 2], 3);
        let outcome = grade(&quiz, &[Some(0), Some(1), Some(0)]).unwrap();
        assert_eq!(outcome.correct_answers, 2);
        assert_eq!(outcome.score, 67);
        assert!(outcome.passed);
    }

    #[test]
    fn fails_below_threshold() {
        let quiz = quiz(80, &[0, 0], 2);
        let outcome = grade(&quiz, &[Some(0), Some(1)]).unwrap();
        assert_eq!(outcome.score, 50);
        assert!(!outcome.passed);
    }

    #[test]
    fn unanswered_grades_as_incorrect() {
        let quiz = quiz(50, &[0, 0], 2);
        let outcome = grade(&quiz, &[Some(0), None]).unwrap();
        assert_eq!(outcome.correct_answers, 1);
        assert_eq!(outcome.score, 50);
        assert!(outcome.passed);
    }

    #[test]
    fn length_mismatch_rejected() {
        let quiz = quiz(50, &[0, 0], 2);
        assert!(matches!(
            grade(&quiz, &[Some(0)]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            grade(&quiz, &[Some(0), Some(0), Some(0)]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_answer_rejected() {
        let quiz = quiz(50, &[0, 0], 2);
        assert!(matches!(
            grade(&quiz, &[Some(2), Some(0)]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            grade(&quiz, &[Some(-1), Some(0)]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn perfect_and_zero_scores() {
        let quiz = quiz(100, &[1, 1], 3);
        assert_eq!(grade(&quiz, &[Some(1), Some(1)]).unwrap().score, 100);
        let outcome = grade(&quiz, &[Some(0), Some(2)]).unwrap();
        assert_eq!(outcome.score, 0);
        assert!(!outcome.passed);
    }
}
