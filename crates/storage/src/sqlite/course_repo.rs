use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tokio::sync::watch;

use course_core::model::{Course, CourseId};

use super::SqliteRepository;
use super::mapping::{course_id_from_i64, course_id_to_i64, ser, status_from_str};
use crate::repository::{CourseRepository, StorageError};

impl SqliteRepository {
    async fn query_all_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, category, total_lessons, completed_lessons, notes, status
            FROM courses
            ORDER BY id DESC
            ",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(course_from_row(&row)?);
        }
        Ok(courses)
    }

    pub(crate) async fn publish_courses(&self) -> Result<(), StorageError> {
        let courses = self.query_all_courses().await?;
        self.feeds().courses.send_replace(courses);
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for SqliteRepository {
    async fn insert(&self, course: &Course) -> Result<CourseId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT OR REPLACE INTO courses (id, title, category, total_lessons, completed_lessons, notes, status)
            VALUES (nullif(?1, 0), ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(course_id_to_i64(course.id())?)
        .bind(course.title())
        .bind(course.category())
        .bind(i64::from(course.total_lessons()))
        .bind(i64::from(course.completed_lessons()))
        .bind(course.notes())
        .bind(course.status().as_str())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = course_id_from_i64(res.last_insert_rowid())?;
        self.publish_courses().await?;
        Ok(id)
    }

    async fn update(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            UPDATE courses
            SET title = ?2,
                category = ?3,
                total_lessons = ?4,
                completed_lessons = ?5,
                notes = ?6,
                status = ?7
            WHERE id = ?1
            ",
        )
        .bind(course_id_to_i64(course.id())?)
        .bind(course.title())
        .bind(course.category())
        .bind(i64::from(course.total_lessons()))
        .bind(i64::from(course.completed_lessons()))
        .bind(course.notes())
        .bind(course.status().as_str())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.publish_courses().await
    }

    async fn delete(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(course_id_to_i64(course.id())?)
            .execute(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.publish_courses().await
    }

    async fn get_by_id(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, category, total_lessons, completed_lessons, notes, status
            FROM courses
            WHERE id = ?1
            LIMIT 1
            ",
        )
        .bind(course_id_to_i64(id)?)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => course_from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Course>, StorageError> {
        self.query_all_courses().await
    }

    fn watch_all(&self) -> watch::Receiver<Vec<Course>> {
        self.feeds().courses.subscribe()
    }
}

fn course_from_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let id = course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let total_lessons = u32::try_from(row.try_get::<i64, _>("total_lessons").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("total_lessons overflow".into()))?;
    let completed_lessons = u32::try_from(row.try_get::<i64, _>("completed_lessons").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("completed_lessons overflow".into()))?;
    let status = status_from_str(&row.try_get::<String, _>("status").map_err(ser)?)?;

    Ok(Course::from_persisted(
        id,
        row.try_get("title").map_err(ser)?,
        row.try_get("category").map_err(ser)?,
        total_lessons,
        completed_lessons,
        row.try_get("notes").map_err(ser)?,
        status,
    ))
}
