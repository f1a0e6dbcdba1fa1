//! Database module for MessVerse
//!
//! Provides SQLite storage for member portraits and gallery memories.

pub mod memories;
pub mod portraits;
pub mod schema;

use crate::config::DatabaseConfig;
use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub use memories::{Memory, NewMemory, MAX_LIST_LIMIT};
pub use portraits::MemberPortrait;

/// Shared handle to the single SQLite connection
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Create a new database connection
    pub fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        schema::init_db(&conn)?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(db_path),
        })
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_db(&conn)?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Open the database described by the configuration
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        match config.path() {
            Some(path) => Self::new(path),
            None => Self::in_memory(),
        }
    }

    /// Run `f` against the connection on the blocking thread pool
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&guard)
        })
        .await?
    }

    /// Get the database file path (`None` when in memory)
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Current time in the fixed-width form stored in `*_at` columns.
/// The fixed width keeps lexical and chronological order identical.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
