use std::sync::Arc;

use tokio::runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use course_core::insights;
use course_core::model::{Course, CourseId, ThemeMode};
use storage::repository::Storage;

use crate::error::DashboardServiceError;

/// Immutable snapshot of everything the dashboard shows.
///
/// Recomputed by the engine whenever any input source emits; never
/// persisted. Consumers hold read-only copies.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub display_name: String,
    /// Store order: most recently inserted first.
    pub courses: Vec<Course>,
    pub overall_progress: f32,
    pub suggestion: Option<String>,
    /// Engine-local transient flag, carried forward across recombinations.
    pub add_dialog_open: bool,
    pub onboarding_completed: bool,
    pub notifications_enabled: bool,
    pub theme_mode: ThemeMode,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            courses: Vec::new(),
            overall_progress: 0.0,
            suggestion: None,
            add_dialog_open: false,
            onboarding_completed: false,
            notifications_enabled: true,
            theme_mode: ThemeMode::System,
        }
    }
}

fn recompute_derived(state: &mut DashboardState) {
    state.overall_progress = insights::overall_progress(&state.courses);
    state.suggestion = insights::suggestion(&state.courses).map(str::to_owned);
}

/// Owns the single source of truth for dashboard-facing state.
///
/// The engine holds a combined-latest subscription over the five live input
/// sequences (course list plus the four preference scalars) and republishes a
/// fresh [`DashboardState`] on every emission. All publishes, including the
/// local dialog toggles, go through the one `watch::Sender` critical section,
/// so the carried-forward dialog flag cannot be lost to a racing
/// recombination.
///
/// Mutation operations validate and normalize their input, then delegate to
/// the stores; the updated snapshot follows when the affected live sequence
/// next emits. They are intended to be spawned fire-and-forget by the
/// presentation layer.
///
/// Add, update, and delete are read-modify-write without a transactional
/// guard; the single-writer model is assumed.
///
/// `Clone` is cheap: all fields are handles.
#[derive(Clone)]
pub struct DashboardService {
    storage: Storage,
    state_tx: Arc<watch::Sender<DashboardState>>,
    shutdown_tx: watch::Sender<bool>,
    /// The spawned recombination task. Wrapped in `Option` so it can be
    /// taken and awaited exactly once by [`shutdown`](DashboardService::shutdown).
    task: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl DashboardService {
    /// Start the engine on the given runtime.
    ///
    /// Spawns the recombination task; until it has combined every source at
    /// least once, subscribers observe `DashboardState::default()`.
    #[must_use]
    pub fn start(storage: Storage, runtime: &runtime::Handle) -> Self {
        let state_tx = Arc::new(watch::channel(DashboardState::default()).0);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = runtime.spawn(run_combine_loop(
            storage.clone(),
            Arc::clone(&state_tx),
            shutdown_rx,
        ));

        Self {
            storage,
            state_tx,
            shutdown_tx,
            task: Arc::new(tokio::sync::Mutex::new(Some(task))),
        }
    }

    /// Build storage backed by `SQLite` and start the engine on it.
    ///
    /// # Errors
    ///
    /// Returns `DashboardServiceError` if storage initialization fails.
    pub async fn start_sqlite(
        db_url: &str,
        runtime: &runtime::Handle,
    ) -> Result<Self, DashboardServiceError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::start(storage, runtime))
    }

    /// Subscribe to published snapshots (latest-value semantics).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state_tx.subscribe()
    }

    /// Normalize and persist a new course.
    ///
    /// Title and category are trimmed and a negative lesson total clamps to
    /// zero; the course starts with no progress. Closes the add-course dialog
    /// on success.
    ///
    /// # Errors
    ///
    /// Returns `DashboardServiceError::Storage` if the insert fails; the
    /// dialog stays open in that case.
    pub async fn add_course(
        &self,
        title: &str,
        category: &str,
        total_lessons: i32,
    ) -> Result<CourseId, DashboardServiceError> {
        let course = Course::new(title, category, total_lessons);
        let id = self.storage.insert(&course).await?;
        self.close_add_course_dialog();
        Ok(id)
    }

    /// Update a course's progress, notes, and derived status atomically.
    ///
    /// The requested count is clamped to `[0, total_lessons]` and the status
    /// re-derived from the clamped count; all three fields go to the store in
    /// one update call. An unknown id is a documented no-op, not an error:
    /// the caller has already lost the reference.
    ///
    /// # Errors
    ///
    /// Returns `DashboardServiceError::Storage` if the read or write fails.
    pub async fn update_progress(
        &self,
        id: CourseId,
        completed_lessons: i32,
        notes: &str,
    ) -> Result<(), DashboardServiceError> {
        let Some(current) = self.storage.get_by_id(id).await? else {
            tracing::debug!(course_id = %id, "progress update for unknown course ignored");
            return Ok(());
        };

        let updated = current.with_progress(completed_lessons, notes);
        self.storage.update(&updated).await?;
        Ok(())
    }

    /// Delete a course, returning the pre-deletion value for undo.
    ///
    /// Returns `Ok(None)` when the id is absent, so callers can distinguish
    /// "nothing to undo" from "undid something".
    ///
    /// # Errors
    ///
    /// Returns `DashboardServiceError::Storage` if the read or write fails.
    pub async fn delete_course(
        &self,
        id: CourseId,
    ) -> Result<Option<Course>, DashboardServiceError> {
        let Some(current) = self.storage.get_by_id(id).await? else {
            return Ok(None);
        };

        self.storage.delete(&current).await?;
        Ok(Some(current))
    }

    /// Re-insert a previously deleted course verbatim.
    ///
    /// The store may reassign the identity.
    ///
    /// # Errors
    ///
    /// Returns `DashboardServiceError::Storage` if the insert fails.
    pub async fn restore_course(
        &self,
        course: &Course,
    ) -> Result<CourseId, DashboardServiceError> {
        let id = self.storage.insert(course).await?;
        Ok(id)
    }

    /// Open the add-course dialog. Local engine state, not persisted.
    pub fn open_add_course_dialog(&self) {
        self.state_tx
            .send_modify(|state| state.add_dialog_open = true);
    }

    /// Close the add-course dialog. Local engine state, not persisted.
    pub fn close_add_course_dialog(&self) {
        self.state_tx
            .send_modify(|state| state.add_dialog_open = false);
    }

    /// # Errors
    ///
    /// Returns `DashboardServiceError::Storage` if the write fails.
    pub async fn save_display_name(&self, name: &str) -> Result<(), DashboardServiceError> {
        self.storage.save_display_name(name).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DashboardServiceError::Storage` if the write fails.
    pub async fn complete_onboarding(&self) -> Result<(), DashboardServiceError> {
        self.storage.complete_onboarding().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DashboardServiceError::Storage` if the write fails.
    pub async fn set_notifications_enabled(
        &self,
        enabled: bool,
    ) -> Result<(), DashboardServiceError> {
        self.storage.set_notifications_enabled(enabled).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DashboardServiceError::Storage` if the write fails.
    pub async fn set_theme_mode(&self, mode: ThemeMode) -> Result<(), DashboardServiceError> {
        self.storage.set_theme_mode(mode).await?;
        Ok(())
    }

    /// Signal the recombination task to stop and wait for it.
    ///
    /// Releases the engine's subscriptions to all five input sequences.
    /// In-flight mutations are not waited for. Calling `shutdown` more than
    /// once is safe -- subsequent calls return immediately.
    pub async fn shutdown(&self) {
        // Ignore errors (the task may already have exited).
        let _ = self.shutdown_tx.send(true);

        let task = self.task.lock().await.take();
        if let Some(join_handle) = task {
            if let Err(err) = join_handle.await {
                tracing::error!(error = %err, "dashboard engine task failed to join");
            }
        }
    }
}

/// Combined-latest loop over the five live input sequences.
///
/// Every emission updates its slot and republishes inside the sender's
/// critical section; the dialog flag is left untouched there and thus
/// carried forward.
async fn run_combine_loop(
    storage: Storage,
    state_tx: Arc<watch::Sender<DashboardState>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut courses_rx = storage.watch_courses();
    let mut display_name_rx = storage.watch_display_name();
    let mut onboarding_rx = storage.watch_onboarding_completed();
    let mut notifications_rx = storage.watch_notifications_enabled();
    let mut theme_rx = storage.watch_theme_mode();

    // First warm combination from the latest value of every source.
    let courses = courses_rx.borrow_and_update().clone();
    let display_name = display_name_rx.borrow_and_update().clone();
    let onboarding_completed = *onboarding_rx.borrow_and_update();
    let notifications_enabled = *notifications_rx.borrow_and_update();
    let theme_mode = *theme_rx.borrow_and_update();
    state_tx.send_modify(|state| {
        state.courses = courses;
        state.display_name = display_name.unwrap_or_default();
        state.onboarding_completed = onboarding_completed;
        state.notifications_enabled = notifications_enabled;
        state.theme_mode = theme_mode;
        recompute_derived(state);
    });
    tracing::info!("dashboard engine: warm");

    loop {
        tokio::select! {
            res = courses_rx.changed() => match res {
                Ok(()) => {
                    let courses = courses_rx.borrow_and_update().clone();
                    tracing::debug!(count = courses.len(), "dashboard engine: course list emitted");
                    state_tx.send_modify(|state| {
                        state.courses = courses;
                        recompute_derived(state);
                    });
                }
                Err(_) => break,
            },
            res = display_name_rx.changed() => match res {
                Ok(()) => {
                    let display_name = display_name_rx.borrow_and_update().clone();
                    state_tx.send_modify(|state| {
                        state.display_name = display_name.unwrap_or_default();
                        recompute_derived(state);
                    });
                }
                Err(_) => break,
            },
            res = onboarding_rx.changed() => match res {
                Ok(()) => {
                    let onboarding_completed = *onboarding_rx.borrow_and_update();
                    state_tx.send_modify(|state| {
                        state.onboarding_completed = onboarding_completed;
                        recompute_derived(state);
                    });
                }
                Err(_) => break,
            },
            res = notifications_rx.changed() => match res {
                Ok(()) => {
                    let notifications_enabled = *notifications_rx.borrow_and_update();
                    state_tx.send_modify(|state| {
                        state.notifications_enabled = notifications_enabled;
                        recompute_derived(state);
                    });
                }
                Err(_) => break,
            },
            res = theme_rx.changed() => match res {
                Ok(()) => {
                    let theme_mode = *theme_rx.borrow_and_update();
                    state_tx.send_modify(|state| {
                        state.theme_mode = theme_mode;
                        recompute_derived(state);
                    });
                }
                Err(_) => break,
            },
            _ = shutdown_rx.changed() => break,
        }
    }
    tracing::info!("dashboard engine: stopped");
}
