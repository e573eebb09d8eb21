#![forbid(unsafe_code)]

pub mod insights;
pub mod model;

pub use insights::{overall_progress, suggestion};
pub use model::{Course, CourseId, CourseStatus, ThemeMode};
