use std::str::FromStr;

use course_core::model::{CourseId, CourseStatus, ThemeMode};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn course_id_to_i64(id: CourseId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("id overflow".into()))
}

pub(crate) fn course_id_from_i64(raw: i64) -> Result<CourseId, StorageError> {
    u64::try_from(raw)
        .map(CourseId::new)
        .map_err(|_| StorageError::Serialization("id sign overflow".into()))
}

pub(crate) fn status_from_str(raw: &str) -> Result<CourseStatus, StorageError> {
    CourseStatus::from_str(raw).map_err(ser)
}

pub(crate) fn theme_from_str(raw: &str) -> Result<ThemeMode, StorageError> {
    ThemeMode::from_str(raw).map_err(ser)
}

pub(crate) fn bool_to_str(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

pub(crate) fn bool_from_str(raw: &str) -> bool {
    raw == "1"
}
