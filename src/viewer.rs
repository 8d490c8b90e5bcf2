use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::course::content::{CourseContent, Section};
use crate::enrollment::progress::Enrollment;

/// Where the course viewer is pointed: a lecture or a section's quiz,
/// addressed by document-order indexes into the course tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    Lecture { section: usize, lecture: usize },
    Quiz { section: usize },
}

/// Pure navigation rules for the course viewer. The client renders whatever
/// this derives from the authoritative course tree and enrollment; it holds
/// no navigation logic of its own.
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    course: &'a CourseContent,
    enrollment: &'a Enrollment,
    /// When false, navigation is linear: a target is selectable only once
    /// everything before it in document order is done.
    free_navigation: bool,
}

impl<'a> Navigator<'a> {
    pub fn new(course: &'a CourseContent, enrollment: &'a Enrollment, free_navigation: bool) -> Self {
        Self {
            course,
            enrollment,
            free_navigation,
        }
    }

    /// Where to land on load: the first item in document order that is not
    /// done. A fully completed enrollment stays at the very first lecture
    /// instead of hunting for leftover items, so reopening a finished course
    /// starts from the top.
    pub fn initial(&self) -> Option<Position> {
        let first = self.first_lecture();
        if self.enrollment.is_completed {
            return first;
        }
        for (s, section) in self.course.sections.iter().enumerate() {
            for (l, lecture) in section.lectures.iter().enumerate() {
                if !self.enrollment.lecture_completed(lecture.id) {
                    return Some(Position::Lecture { section: s, lecture: l });
                }
            }
            if section.has_quiz() && !self.quiz_done(section) {
                return Some(Position::Quiz { section: s });
            }
        }
        first
    }

    /// Advance one step. `None` is terminal: the course has no further item
    /// to move to.
    pub fn next(&self, position: Position) -> Option<Position> {
        match position {
            Position::Lecture { section, lecture } => {
                let current = self.course.sections.get(section)?;
                if lecture + 1 < current.lectures.len() {
                    return Some(Position::Lecture {
                        section,
                        lecture: lecture + 1,
                    });
                }
                if let Some(pos) = self.first_lecture_after(section) {
                    return Some(pos);
                }
                // Course exhausted: surface the current section's quiz if the
                // student has not taken it yet.
                if current.has_quiz() && self.enrollment.attempt_for(current.id).is_none() {
                    return Some(Position::Quiz { section });
                }
                None
            }
            Position::Quiz { section } => self.first_lecture_after(section),
        }
    }

    /// Step back, clamped at the very first lecture.
    pub fn previous(&self, position: Position) -> Position {
        match position {
            Position::Lecture { section, lecture } => {
                if lecture > 0 {
                    return Position::Lecture {
                        section,
                        lecture: lecture - 1,
                    };
                }
                self.last_lecture_before(section).unwrap_or(position)
            }
            Position::Quiz { section } => {
                let lectures = self
                    .course
                    .sections
                    .get(section)
                    .map(|s| s.lectures.len())
                    .unwrap_or(0);
                if lectures > 0 {
                    Position::Lecture {
                        section,
                        lecture: lectures - 1,
                    }
                } else {
                    self.last_lecture_before(section)
                        .unwrap_or(Position::Quiz { section })
                }
            }
        }
    }

    /// Direct sidebar jump. `None` means the target is out of range or, in
    /// linear mode, still gated behind unfinished prerequisites.
    pub fn select(&self, target: Position) -> Option<Position> {
        if !self.in_range(target) {
            return None;
        }
        if self.can_select(target) {
            Some(target)
        } else {
            None
        }
    }

    pub fn can_select(&self, target: Position) -> bool {
        if !self.in_range(target) {
            return false;
        }
        if self.free_navigation || self.enrollment.is_completed {
            return true;
        }
        // Linear mode: everything strictly before the target in document
        // order must be done.
        let (target_section, target_lecture) = match target {
            Position::Lecture { section, lecture } => (section, Some(lecture)),
            Position::Quiz { section } => (section, None),
        };
        for (s, section) in self.course.sections.iter().enumerate() {
            if s > target_section {
                break;
            }
            for (l, lecture) in section.lectures.iter().enumerate() {
                let before_target =
                    s < target_section || target_lecture.is_none_or(|tl| l < tl);
                if before_target && !self.enrollment.lecture_completed(lecture.id) {
                    return false;
                }
            }
            if s < target_section
                && section.has_quiz()
                && !self.enrollment.quiz_passed(section.id)
            {
                return false;
            }
        }
        true
    }

    fn in_range(&self, position: Position) -> bool {
        match position {
            Position::Lecture { section, lecture } => self
                .course
                .sections
                .get(section)
                .is_some_and(|s| lecture < s.lectures.len()),
            Position::Quiz { section } => self
                .course
                .sections
                .get(section)
                .is_some_and(|s| s.has_quiz()),
        }
    }

    fn quiz_done(&self, section: &Section) -> bool {
        self.enrollment.attempt_for(section.id).is_some()
    }

    fn first_lecture(&self) -> Option<Position> {
        self.course
            .sections
            .iter()
            .position(|s| !s.lectures.is_empty())
            .map(|section| Position::Lecture { section, lecture: 0 })
    }

    fn first_lecture_after(&self, section: usize) -> Option<Position> {
        self.course.sections[section + 1..]
            .iter()
            .position(|s| !s.lectures.is_empty())
            .map(|offset| Position::Lecture {
                section: section + 1 + offset,
                lecture: 0,
            })
    }

    fn last_lecture_before(&self, section: usize) -> Option<Position> {
        self.course.sections[..section]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, s)| !s.lectures.is_empty())
            .map(|(i, s)| Position::Lecture {
                section: i,
                lecture: s.lectures.len() - 1,
            })
    }
}
