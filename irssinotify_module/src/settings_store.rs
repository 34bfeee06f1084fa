//! Small persistent name/value store for module settings.
//!
//! Bouncer hosts usually hand modules their own settings facility; the SQLite
//! store backs the standalone relay and keeps values across restarts.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SettingsStoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait SettingsStore {
    fn get(&self, name: &str) -> Result<Option<String>, SettingsStoreError>;
    fn set(&mut self, name: &str, value: &str) -> Result<(), SettingsStoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: HashMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, name: &str) -> Result<Option<String>, SettingsStoreError> {
        Ok(self.values.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), SettingsStoreError> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings rows scoped by module name, so several modules can share one file.
#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    path: PathBuf,
    module: String,
}

impl SqliteSettingsStore {
    pub fn new(path: impl Into<PathBuf>, module: impl Into<String>) -> Result<Self, SettingsStoreError> {
        let store = Self {
            path: path.into(),
            module: module.into(),
        };
        let _ = store.open()?;
        Ok(store)
    }

    pub fn list(&self) -> Result<Vec<(String, String)>, SettingsStoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT name, value
             FROM module_settings
             WHERE module = ?1
             ORDER BY name",
        )?;
        let rows = stmt.query_map(params![self.module], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }

    fn open(&self) -> Result<Connection, SettingsStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS module_settings (
                module TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (module, name)
            )",
            [],
        )?;
        Ok(conn)
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn get(&self, name: &str) -> Result<Option<String>, SettingsStoreError> {
        let conn = self.open()?;
        let value = conn
            .query_row(
                "SELECT value FROM module_settings WHERE module = ?1 AND name = ?2",
                params![self.module, name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), SettingsStoreError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO module_settings (module, name, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(module, name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![self.module, name, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
