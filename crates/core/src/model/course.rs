use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::ids::CourseId;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle status of a course, denormalized for storage.
///
/// The status is a pure function of the lesson counts; it is persisted
/// alongside them but recomputed at every write site that changes counts.
/// There is no direct status setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    InProgress,
    Completed,
    Paused,
}

impl CourseStatus {
    /// Derives the status from the lesson counts.
    ///
    /// Completed when every lesson of a non-empty course is done, paused when
    /// none are, in progress otherwise.
    #[must_use]
    pub fn derive(completed_lessons: u32, total_lessons: u32) -> Self {
        if completed_lessons >= total_lessons && total_lessons > 0 {
            Self::Completed
        } else if completed_lessons == 0 {
            Self::Paused
        } else {
            Self::InProgress
        }
    }

    /// Storage representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Paused => "PAUSED",
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown course status: {0}")]
pub struct ParseCourseStatusError(String);

impl FromStr for CourseStatus {
    type Err = ParseCourseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "PAUSED" => Ok(Self::Paused),
            other => Err(ParseCourseStatusError(other.to_string())),
        }
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course the user is studying, with lesson counts and free-text notes.
///
/// Numeric inputs are never rejected: out-of-range values are clamped into
/// range at the constructor and at the progress-update site. Total lessons is
/// immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    category: String,
    total_lessons: u32,
    completed_lessons: u32,
    notes: String,
    status: CourseStatus,
}

impl Course {
    /// Creates a new course with no progress yet.
    ///
    /// Title and category are trimmed, a negative lesson total is clamped to
    /// zero. New courses start in progress with empty notes and an unassigned
    /// id.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        total_lessons: i32,
    ) -> Self {
        Self {
            id: CourseId::new(0),
            title: title.into().trim().to_owned(),
            category: category.into().trim().to_owned(),
            total_lessons: u32::try_from(total_lessons.max(0)).unwrap_or(0),
            completed_lessons: 0,
            notes: String::new(),
            status: CourseStatus::InProgress,
        }
    }

    /// Rehydrates a course from storage. Fields are taken verbatim.
    #[must_use]
    pub fn from_persisted(
        id: CourseId,
        title: String,
        category: String,
        total_lessons: u32,
        completed_lessons: u32,
        notes: String,
        status: CourseStatus,
    ) -> Self {
        Self {
            id,
            title,
            category,
            total_lessons,
            completed_lessons,
            notes,
            status,
        }
    }

    /// Returns the course under its store-assigned identity.
    #[must_use]
    pub fn assign_id(mut self, id: CourseId) -> Self {
        self.id = id;
        self
    }

    /// Returns a copy with updated progress.
    ///
    /// The requested count is clamped to `[0, total_lessons]`, the status is
    /// re-derived from the clamped count, and the notes are replaced. This is
    /// the only transition site for [`CourseStatus`].
    #[must_use]
    pub fn with_progress(&self, completed_lessons: i32, notes: impl Into<String>) -> Self {
        let total = i64::from(self.total_lessons);
        let clamped = i64::from(completed_lessons).clamp(0, total);
        let completed = u32::try_from(clamped).unwrap_or(0);

        Self {
            completed_lessons: completed,
            notes: notes.into(),
            status: CourseStatus::derive(completed, self.total_lessons),
            ..self.clone()
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn total_lessons(&self) -> u32 {
        self.total_lessons
    }

    #[must_use]
    pub fn completed_lessons(&self) -> u32 {
        self.completed_lessons
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn status(&self) -> CourseStatus {
        self.status
    }

    /// Completion ratio in `[0, 1]`, or `None` for a course with no lessons.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> Option<f32> {
        (self.total_lessons > 0)
            .then(|| self.completed_lessons as f32 / self.total_lessons as f32)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
