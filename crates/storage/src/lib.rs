#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CourseRepository, InMemoryRepository, PreferenceRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
