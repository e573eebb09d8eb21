use course_core::model::{Course, CourseId, CourseStatus, ThemeMode};
use storage::repository::{CourseRepository, PreferenceRepository, Storage};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo.prime_feeds().await.expect("prime");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_course_fields() {
    let repo = connect("memdb_roundtrip").await;

    let course = Course::new("Rust Basics", "Backend", 10).with_progress(4, "ch. 4 done");
    let id = repo.insert(&course).await.unwrap();
    assert!(!id.is_unassigned());

    let fetched = repo.get_by_id(id).await.unwrap().expect("course exists");
    assert_eq!(fetched.id(), id);
    assert_eq!(fetched.title(), "Rust Basics");
    assert_eq!(fetched.category(), "Backend");
    assert_eq!(fetched.total_lessons(), 10);
    assert_eq!(fetched.completed_lessons(), 4);
    assert_eq!(fetched.notes(), "ch. 4 done");
    assert_eq!(fetched.status(), CourseStatus::InProgress);
}

#[tokio::test]
async fn sqlite_assigns_fresh_ids_and_replaces_on_nonzero_id() {
    let repo = connect("memdb_ids").await;

    let first = repo.insert(&Course::new("One", "Backend", 10)).await.unwrap();
    let second = repo.insert(&Course::new("Two", "Backend", 10)).await.unwrap();
    assert!(second > first);

    // Re-inserting under an existing id replaces that row (restore path).
    let replacement = Course::new("One Revised", "Backend", 10).assign_id(first);
    let replaced_id = repo.insert(&replacement).await.unwrap();
    assert_eq!(replaced_id, first);

    let all = repo.list_all().await.unwrap();
    assert_eq!(all.len(), 2);
    let revised = repo.get_by_id(first).await.unwrap().unwrap();
    assert_eq!(revised.title(), "One Revised");
}

#[tokio::test]
async fn sqlite_lists_most_recent_first() {
    let repo = connect("memdb_order").await;

    repo.insert(&Course::new("One", "Backend", 10)).await.unwrap();
    repo.insert(&Course::new("Two", "Frontend", 5)).await.unwrap();
    repo.insert(&Course::new("Three", "UI/UX", 8)).await.unwrap();

    let courses = repo.list_all().await.unwrap();
    let titles: Vec<String> = courses.iter().map(|c| c.title().to_string()).collect();
    assert_eq!(titles, ["Three", "Two", "One"]);
}

#[tokio::test]
async fn sqlite_update_rewrites_counts_notes_and_status_together() {
    let repo = connect("memdb_update").await;

    let id = repo.insert(&Course::new("One", "Backend", 10)).await.unwrap();
    let stored = repo.get_by_id(id).await.unwrap().unwrap();
    let updated = stored.with_progress(10, "all done");
    repo.update(&updated).await.unwrap();

    let fetched = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(fetched.completed_lessons(), 10);
    assert_eq!(fetched.notes(), "all done");
    assert_eq!(fetched.status(), CourseStatus::Completed);
}

#[tokio::test]
async fn sqlite_update_on_missing_row_is_silent() {
    let repo = connect("memdb_update_missing").await;

    let ghost = Course::new("Ghost", "Backend", 10).assign_id(CourseId::new(99));
    repo.update(&ghost).await.unwrap();
    assert!(repo.get_by_id(CourseId::new(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_course_feed_tracks_mutations() {
    let repo = connect("memdb_feed").await;
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
async fn sqlite_preferences_default_then_persist() {
    let repo = connect("memdb_prefs").await;

    assert_eq!(*repo.watch_display_name().borrow(), None);
    assert!(!*repo.watch_onboarding_completed().borrow());
    assert!(*repo.watch_notifications_enabled().borrow());
    assert_eq!(*repo.watch_theme_mode().borrow(), ThemeMode::System);

    repo.set_display_name("Ana").await.unwrap();
    repo.set_onboarding_completed(true).await.unwrap();
    repo.set_notifications_enabled(false).await.unwrap();
    repo.set_theme_mode(ThemeMode::Dark).await.unwrap();

    assert_eq!(repo.watch_display_name().borrow().as_deref(), Some("Ana"));
    assert!(*repo.watch_onboarding_completed().borrow());
    assert!(!*repo.watch_notifications_enabled().borrow());
    assert_eq!(*repo.watch_theme_mode().borrow(), ThemeMode::Dark);

    // A second connection to the same database sees the persisted values
    // once its feeds are primed.
    let second = connect("memdb_prefs").await;
    assert_eq!(second.watch_display_name().borrow().as_deref(), Some("Ana"));
    assert!(*second.watch_onboarding_completed().borrow());
    assert!(!*second.watch_notifications_enabled().borrow());
    assert_eq!(*second.watch_theme_mode().borrow(), ThemeMode::Dark);
}

#[tokio::test]
async fn storage_facade_builds_over_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_facade?mode=memory&cache=shared")
        .await
        .expect("storage");

    let id = storage
        .insert(&Course::new("One", "Backend", 10))
        .await
        .unwrap();
    assert!(storage.get_by_id(id).await.unwrap().is_some());

    storage.save_display_name("Ana").await.unwrap();
    assert_eq!(
        storage.watch_display_name().borrow().as_deref(),
        Some("Ana")
    );
}
