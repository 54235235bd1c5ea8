//! SQLite storage layer for locally persisted settings and credentials

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::debug;

use crate::credentials::CredentialSet;
use crate::error::Result;
use crate::types::GenerationSettings;

/// Storage backend using SQLite
pub struct Storage {
    conn: Mutex<Connection>,
}

/// Single key holding the serialized credential set
pub const SETTING_CREDENTIALS: &str = "credentials";
/// Single key holding the serialized generation settings
pub const SETTING_GENERATION: &str = "generation_settings";

impl Storage {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Set a setting value, overwriting any previous value
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        debug!(key, "setting saved");
        Ok(())
    }

    /// Get a setting value
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Remove a setting; used when the user explicitly clears stored keys
    pub fn delete_setting(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Persist the credential set under its single named key
    pub fn save_credentials(&self, credentials: &CredentialSet) -> Result<()> {
        let json = serde_json::to_string(credentials)?;
        self.set_setting(SETTING_CREDENTIALS, &json)
    }

    pub fn load_credentials(&self) -> Result<Option<CredentialSet>> {
        match self.get_setting(SETTING_CREDENTIALS)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist generation settings under their single named key
    pub fn save_generation_settings(&self, settings: &GenerationSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.set_setting(SETTING_GENERATION, &json)
    }

    pub fn load_generation_settings(&self) -> Result<Option<GenerationSettings>> {
        match self.get_setting(SETTING_GENERATION)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
