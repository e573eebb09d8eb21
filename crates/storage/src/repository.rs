use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use course_core::model::{Course, CourseId, ThemeMode};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Watch channels carrying the live view of each store.
///
/// Adapters publish on these after every committed mutation, so subscribers
/// always observe the latest value (intermediate values may be skipped).
#[derive(Debug)]
pub(crate) struct LiveFeeds {
    pub(crate) courses: watch::Sender<Vec<Course>>,
    pub(crate) display_name: watch::Sender<Option<String>>,
    pub(crate) onboarding_completed: watch::Sender<bool>,
    pub(crate) notifications_enabled: watch::Sender<bool>,
    pub(crate) theme_mode: watch::Sender<ThemeMode>,
}

impl LiveFeeds {
    pub(crate) fn new() -> Self {
        Self {
            courses: watch::channel(Vec::new()).0,
            display_name: watch::channel(None).0,
            onboarding_completed: watch::channel(false).0,
            notifications_enabled: watch::channel(true).0,
            theme_mode: watch::channel(ThemeMode::default()).0,
        }
    }
}

/// Repository contract for the course store.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist a course and return its identity.
    ///
    /// An unassigned (zero) id lets the store allocate a fresh one; a
    /// nonzero id replaces any existing row with that id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn insert(&self, course: &Course) -> Result<CourseId, StorageError>;

    /// Overwrite the row matching the course id.
    ///
    /// A row that no longer exists is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn update(&self, course: &Course) -> Result<(), StorageError>;

    /// Remove the row matching the course id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn delete(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by id.
    ///
    /// Returns `Ok(None)` when the course does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_by_id(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// All courses ordered by id descending (most recently inserted first).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_all(&self) -> Result<Vec<Course>, StorageError>;

    /// Live sequence of all courses, primed with the current contents.
    fn watch_all(&self) -> watch::Receiver<Vec<Course>>;
}

/// Repository contract for the scalar preference store.
///
/// Each key is independently settable and exposed as an independent live
/// sequence primed with the stored (or default) value.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set_display_name(&self, name: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set_onboarding_completed(&self, completed: bool) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set_notifications_enabled(&self, enabled: bool) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set_theme_mode(&self, mode: ThemeMode) -> Result<(), StorageError>;

    /// Live sequence of the display name; `None` while unset.
    fn watch_display_name(&self) -> watch::Receiver<Option<String>>;

    /// Live sequence of the onboarding flag (default false).
    fn watch_onboarding_completed(&self) -> watch::Receiver<bool>;

    /// Live sequence of the notifications flag (default true).
    fn watch_notifications_enabled(&self) -> watch::Receiver<bool>;

    /// Live sequence of the theme mode (default system).
    fn watch_theme_mode(&self) -> watch::Receiver<ThemeMode>;
}

struct CourseTable {
    rows: HashMap<u64, Course>,
    next_id: u64,
}

struct StoredPreferences {
    display_name: Option<String>,
    onboarding_completed: bool,
    notifications_enabled: bool,
    theme_mode: ThemeMode,
}

impl Default for StoredPreferences {
    fn default() -> Self {
        Self {
            display_name: None,
            onboarding_completed: false,
            notifications_enabled: true,
            theme_mode: ThemeMode::System,
        }
    }
}

/// Simple in-memory implementation of both stores for testing and
/// prototyping, including the live feeds.
#[derive(Clone)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<CourseTable>>,
    prefs: Arc<Mutex<StoredPreferences>>,
    feeds: Arc<LiveFeeds>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            courses: Arc::new(Mutex::new(CourseTable {
                rows: HashMap::new(),
                next_id: 1,
            })),
            prefs: Arc::new(Mutex::new(StoredPreferences::default())),
            feeds: Arc::new(LiveFeeds::new()),
        }
    }

    fn snapshot(rows: &HashMap<u64, Course>) -> Vec<Course> {
        let mut courses: Vec<Course> = rows.values().cloned().collect();
        courses.sort_by(|a, b| b.id().cmp(&a.id()));
        courses
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn insert(&self, course: &Course) -> Result<CourseId, StorageError> {
        let (id, snapshot) = {
            let mut table = self
                .courses
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            let raw = if course.id().is_unassigned() {
                table.next_id
            } else {
                course.id().value()
            };
            table.next_id = table.next_id.max(raw + 1);
            let id = CourseId::new(raw);
            table.rows.insert(raw, course.clone().assign_id(id));
            (id, Self::snapshot(&table.rows))
        };
        self.feeds.courses.send_replace(snapshot);
        Ok(id)
    }

    async fn update(&self, course: &Course) -> Result<(), StorageError> {
        let snapshot = {
            let mut table = self
                .courses
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            let raw = course.id().value();
            if table.rows.contains_key(&raw) {
                table.rows.insert(raw, course.clone());
            }
            Self::snapshot(&table.rows)
        };
        self.feeds.courses.send_replace(snapshot);
        Ok(())
    }

    async fn delete(&self, course: &Course) -> Result<(), StorageError> {
        let snapshot = {
            let mut table = self
                .courses
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            table.rows.remove(&course.id().value());
            Self::snapshot(&table.rows)
        };
        self.feeds.courses.send_replace(snapshot);
        Ok(())
    }

    async fn get_by_id(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let table = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(table.rows.get(&id.value()).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Course>, StorageError> {
        let table = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self::snapshot(&table.rows))
    }

    fn watch_all(&self) -> watch::Receiver<Vec<Course>> {
        self.feeds.courses.subscribe()
    }
}

#[async_trait]
impl PreferenceRepository for InMemoryRepository {
    async fn set_display_name(&self, name: &str) -> Result<(), StorageError> {
        {
            let mut prefs = self
                .prefs
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            prefs.display_name = Some(name.to_string());
        }
        self.feeds.display_name.send_replace(Some(name.to_string()));
        Ok(())
    }

    async fn set_onboarding_completed(&self, completed: bool) -> Result<(), StorageError> {
        {
            let mut prefs = self
                .prefs
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            prefs.onboarding_completed = completed;
        }
        self.feeds.onboarding_completed.send_replace(completed);
        Ok(())
    }

    async fn set_notifications_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        {
            let mut prefs = self
                .prefs
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            prefs.notifications_enabled = enabled;
        }
        self.feeds.notifications_enabled.send_replace(enabled);
        Ok(())
    }

    async fn set_theme_mode(&self, mode: ThemeMode) -> Result<(), StorageError> {
        {
            let mut prefs = self
                .prefs
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            prefs.theme_mode = mode;
        }
        self.feeds.theme_mode.send_replace(mode);
        Ok(())
    }

    fn watch_display_name(&self) -> watch::Receiver<Option<String>> {
        self.feeds.display_name.subscribe()
    }

    fn watch_onboarding_completed(&self) -> watch::Receiver<bool> {
        self.feeds.onboarding_completed.subscribe()
    }

    fn watch_notifications_enabled(&self) -> watch::Receiver<bool> {
        self.feeds.notifications_enabled.subscribe()
    }

    fn watch_theme_mode(&self) -> watch::Receiver<ThemeMode> {
        self.feeds.theme_mode.subscribe()
    }
}

/// Unifies the course and preference stores behind one interface for easy
/// backend swapping. Pure delegation, no transformation logic.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub prefs: Arc<dyn PreferenceRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let prefs: Arc<dyn PreferenceRepository> = Arc::new(repo);
        Self { courses, prefs }
    }

    /// # Errors
    ///
    /// Propagates whatever the course store signals.
    pub async fn insert(&self, course: &Course) -> Result<CourseId, StorageError> {
        self.courses.insert(course).await
    }

    /// # Errors
    ///
    /// Propagates whatever the course store signals.
    pub async fn update(&self, course: &Course) -> Result<(), StorageError> {
        self.courses.update(course).await
    }

    /// # Errors
    ///
    /// Propagates whatever the course store signals.
    pub async fn delete(&self, course: &Course) -> Result<(), StorageError> {
        self.courses.delete(course).await
    }

    /// # Errors
    ///
    /// Propagates whatever the course store signals.
    pub async fn get_by_id(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        self.courses.get_by_id(id).await
    }

    /// # Errors
    ///
    /// Propagates whatever the course store signals.
    pub async fn list_all(&self) -> Result<Vec<Course>, StorageError> {
        self.courses.list_all().await
    }

    #[must_use]
    pub fn watch_courses(&self) -> watch::Receiver<Vec<Course>> {
        self.courses.watch_all()
    }

    /// # Errors
    ///
    /// Propagates whatever the preference store signals.
    pub async fn save_display_name(&self, name: &str) -> Result<(), StorageError> {
        self.prefs.set_display_name(name).await
    }

    /// # Errors
    ///
    /// Propagates whatever the preference store signals.
    pub async fn complete_onboarding(&self) -> Result<(), StorageError> {
        self.prefs.set_onboarding_completed(true).await
    }

    /// # Errors
    ///
    /// Propagates whatever the preference store signals.
    pub async fn set_notifications_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.prefs.set_notifications_enabled(enabled).await
    }

    /// # Errors
    ///
    /// Propagates whatever the preference store signals.
    pub async fn set_theme_mode(&self, mode: ThemeMode) -> Result<(), StorageError> {
        self.prefs.set_theme_mode(mode).await
    }

    #[must_use]
    pub fn watch_display_name(&self) -> watch::Receiver<Option<String>> {
        self.prefs.watch_display_name()
    }

    #[must_use]
    pub fn watch_onboarding_completed(&self) -> watch::Receiver<bool> {
        self.prefs.watch_onboarding_completed()
    }

    #[must_use]
    pub fn watch_notifications_enabled(&self) -> watch::Receiver<bool> {
        self.prefs.watch_notifications_enabled()
    }

    #[must_use]
    pub fn watch_theme_mode(&self) -> watch::Receiver<ThemeMode> {
        self.prefs.watch_theme_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_assigns_ascending_ids() {
        let repo = InMemoryRepository::new();
        let first = repo.insert(&Course::new("One", "Backend", 10)).await.unwrap();
        let second = repo.insert(&Course::new("Two", "Backend", 10)).await.unwrap();
        assert!(second > first);
        assert!(!first.is_unassigned());
    }

    #[tokio::test]
    async fn round_trips_course_fields() {
        let repo = InMemoryRepository::new();
        let course = Course::new("Rust Basics", "Backend", 10).with_progress(4, "ch. 4 done");
        let id = repo.insert(&course).await.unwrap();

        let fetched = repo.get_by_id(id).await.unwrap().expect("course exists");
        assert_eq!(fetched.title(), "Rust Basics");
        assert_eq!(fetched.category(), "Backend");
        assert_eq!(fetched.total_lessons(), 10);
        assert_eq!(fetched.completed_lessons(), 4);
        assert_eq!(fetched.notes(), "ch. 4 done");
        assert_eq!(fetched.status(), course.status());
    }

    #[tokio::test]
    async fn list_all_orders_most_recent_first() {
        let repo = InMemoryRepository::new();
        repo.insert(&Course::new("One", "Backend", 10)).await.unwrap();
        repo.insert(&Course::new("Two", "Backend", 10)).await.unwrap();
        repo.insert(&Course::new("Three", "Backend", 10)).await.unwrap();

        let courses = repo.list_all().await.unwrap();
        let titles: Vec<String> = courses.iter().map(|c| c.title().to_string()).collect();
        assert_eq!(titles, ["Three", "Two", "One"]);
    }

    #[tokio::test]
    async fn insert_with_existing_id_replaces_the_row() {
        let repo = InMemoryRepository::new();
        let id = repo.insert(&Course::new("One", "Backend", 10)).await.unwrap();
        let replacement = Course::new("One Revised", "Backend", 10).assign_id(id);

        let replaced_id = repo.insert(&replacement).await.unwrap();
        assert_eq!(replaced_id, id);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.title(), "One Revised");
    }

    #[tokio::test]
    async fn update_on_missing_row_is_silent() {
        let repo = InMemoryRepository::new();
        let ghost = Course::new("Ghost", "Backend", 10).assign_id(CourseId::new(99));
        repo.update(&ghost).await.unwrap();
        assert!(repo.get_by_id(CourseId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn watch_all_is_primed_and_tracks_mutations() {
        let repo = InMemoryRepository::new();
        let mut rx = repo.watch_all();
        assert!(rx.borrow_and_update().is_empty());

        let id = repo.insert(&Course::new("One", "Backend", 10)).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        let course = repo.get_by_id(id).await.unwrap().unwrap();
        repo.delete(&course).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn preference_feeds_start_at_defaults() {
        let repo = InMemoryRepository::new();
        assert_eq!(*repo.watch_display_name().borrow(), None);
        assert!(!*repo.watch_onboarding_completed().borrow());
        assert!(*repo.watch_notifications_enabled().borrow());
        assert_eq!(*repo.watch_theme_mode().borrow(), ThemeMode::System);
    }

    #[tokio::test]
    async fn preference_setters_publish() {
        let repo = InMemoryRepository::new();
        let mut name_rx = repo.watch_display_name();
        let mut theme_rx = repo.watch_theme_mode();

        repo.set_display_name("Ana").await.unwrap();
        name_rx.changed().await.unwrap();
        assert_eq!(name_rx.borrow_and_update().as_deref(), Some("Ana"));

        repo.set_theme_mode(ThemeMode::Dark).await.unwrap();
        theme_rx.changed().await.unwrap();
        assert_eq!(*theme_rx.borrow_and_update(), ThemeMode::Dark);
    }

    #[tokio::test]
    async fn facade_delegates_to_both_stores() {
        let storage = Storage::in_memory();
        let id = storage.insert(&Course::new("One", "Backend", 10)).await.unwrap();
        assert!(storage.get_by_id(id).await.unwrap().is_some());

        storage.complete_onboarding().await.unwrap();
        assert!(*storage.watch_onboarding_completed().borrow());
    }
}
