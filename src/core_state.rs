//! Shared application state.
//!
//! One SQLite connection behind a mutex, plus the loaded configuration.
//! The store is low-traffic CRUD, so a single serialized connection is
//! enough; handlers take the lock only for the duration of their queries.

use std::sync::{Mutex, MutexGuard};

use crate::config::ServerConfig;
use crate::db;

pub struct CoreState {
    db: Mutex<rusqlite::Connection>,
    pub config: ServerConfig,
}

impl CoreState {
    /// Open (and migrate) the database at the configured path.
    pub fn new(config: ServerConfig) -> Result<Self, CoreError> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Io(e.to_string()))?;
        }
        std::fs::create_dir_all(&config.uploads_dir).map_err(|e| CoreError::Io(e.to_string()))?;
        let conn = db::sqlite::open_database(&config.database_path)?;
        Ok(Self {
            db: Mutex::new(conn),
            config,
        })
    }

    /// In-memory state for tests.
    #[cfg(test)]
    pub fn in_memory(config: ServerConfig) -> Result<Self, CoreError> {
        let conn = db::sqlite::open_memory_database()?;
        Ok(Self {
            db: Mutex::new(conn),
            config,
        })
    }

    /// Acquire the database connection for a batch of queries.
    pub fn lock_db(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, CoreError> {
        self.db.lock().map_err(|_| CoreError::LockPoisoned)
    }
}

/// Errors from shared-state operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Filesystem error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn in_memory_state_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::in_memory(ServerConfig::for_tests(dir.path().to_path_buf())).unwrap();
        let conn = state.lock_db().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn new_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::for_tests(dir.path().to_path_buf());
        config.database_path = dir.path().join("nested/data/medi.db");
        config.uploads_dir = dir.path().join("nested/uploads");
        let state = CoreState::new(config).unwrap();
        assert!(state.config.database_path.exists());
        assert!(state.config.uploads_dir.exists());
    }
}
