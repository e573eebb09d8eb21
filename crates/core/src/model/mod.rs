mod course;
mod ids;
mod preferences;

pub use course::{Course, CourseStatus, ParseCourseStatusError};
pub use ids::{CourseId, ParseIdError};
pub use preferences::{ParseThemeModeError, ThemeMode};
