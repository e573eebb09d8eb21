use async_trait::async_trait;
use sqlx::Row;
use tokio::sync::watch;

use course_core::model::ThemeMode;

use super::SqliteRepository;
use super::mapping::{bool_from_str, bool_to_str, ser, theme_from_str};
use crate::repository::{PreferenceRepository, StorageError};

const DISPLAY_NAME_KEY: &str = "display_name";
const ONBOARDING_COMPLETED_KEY: &str = "onboarding_completed";
const NOTIFICATIONS_ENABLED_KEY: &str = "notifications_enabled";
const THEME_MODE_KEY: &str = "theme_mode";

impl SqliteRepository {
    async fn get_pref(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM preferences WHERE key = ?1")
            .bind(key)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| r.try_get::<String, _>("value").map_err(ser))
            .transpose()
    }

    async fn set_pref(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO preferences (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    pub(crate) async fn publish_preferences(&self) -> Result<(), StorageError> {
        let display_name = self.get_pref(DISPLAY_NAME_KEY).await?;
        self.feeds().display_name.send_replace(display_name);

        let onboarding = self
            .get_pref(ONBOARDING_COMPLETED_KEY)
            .await?
            .is_some_and(|raw| bool_from_str(&raw));
        self.feeds().onboarding_completed.send_replace(onboarding);

        let notifications = self
            .get_pref(NOTIFICATIONS_ENABLED_KEY)
            .await?
            .map_or(true, |raw| bool_from_str(&raw));
        self.feeds()
            .notifications_enabled
            .send_replace(notifications);

        let theme = match self.get_pref(THEME_MODE_KEY).await? {
            Some(raw) => theme_from_str(&raw)?,
            None => ThemeMode::default(),
        };
        self.feeds().theme_mode.send_replace(theme);

        Ok(())
    }
}

#[async_trait]
impl PreferenceRepository for SqliteRepository {
    async fn set_display_name(&self, name: &str) -> Result<(), StorageError> {
        self.set_pref(DISPLAY_NAME_KEY, name).await?;
        self.feeds().display_name.send_replace(Some(name.to_string()));
        Ok(())
    }

    async fn set_onboarding_completed(&self, completed: bool) -> Result<(), StorageError> {
        self.set_pref(ONBOARDING_COMPLETED_KEY, bool_to_str(completed))
            .await?;
        self.feeds().onboarding_completed.send_replace(completed);
        Ok(())
    }

    async fn set_notifications_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.set_pref(NOTIFICATIONS_ENABLED_KEY, bool_to_str(enabled))
            .await?;
        self.feeds().notifications_enabled.send_replace(enabled);
        Ok(())
    }

    async fn set_theme_mode(&self, mode: ThemeMode) -> Result<(), StorageError> {
        self.set_pref(THEME_MODE_KEY, mode.as_str()).await?;
        self.feeds().theme_mode.send_replace(mode);
        Ok(())
    }

    fn watch_display_name(&self) -> watch::Receiver<Option<String>> {
        self.feeds().display_name.subscribe()
    }

    fn watch_onboarding_completed(&self) -> watch::Receiver<bool> {
        self.feeds().onboarding_completed.subscribe()
    }

    fn watch_notifications_enabled(&self) -> watch::Receiver<bool> {
        self.feeds().notifications_enabled.subscribe()
    }

    fn watch_theme_mode(&self) -> watch::Receiver<ThemeMode> {
        self.feeds().theme_mode.subscribe()
    }
}
