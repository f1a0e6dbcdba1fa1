//! MessVerse - backend for member portraits and the memories gallery
//!
//! This crate provides:
//! - SQLite storage for portrait and gallery metadata
//! - A media host client that stores and transforms the image bytes
//! - An HTTP API with an optional shared-key gate and per-client rate limiting
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use messverse::{Config, Core};
//!
//! let config = Config::from_file("messverse.toml").unwrap();
//! let core = Core::new(config).unwrap();
//! // core.start_api_server().await.unwrap();
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! messverse --config messverse.toml
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;

// Re-export main types for convenience
pub use config::Config;
pub use db::Database;
pub use error::{CoreError, Result};

use media::{CloudinaryClient, MediaStore};
use std::sync::Arc;

/// Core service that owns the long-lived handles
pub struct Core {
    /// Configuration
    pub config: Config,

    /// Database connection
    pub db: Arc<Database>,

    /// Media host client
    media: Arc<dyn MediaStore>,
}

impl Core {
    /// Open the database and build the media client.
    ///
    /// Fails when the database cannot be opened or media credentials are missing,
    /// before anything is bound.
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::open(&config.database)?;
        match db.path() {
            Some(path) => tracing::info!("Database ready at {}", path.display()),
            None => tracing::info!("Using in-memory database"),
        }

        let media = CloudinaryClient::new(&config.media)?;

        Ok(Core {
            config,
            db: Arc::new(db),
            media: Arc::new(media),
        })
    }

    /// Create a Core from existing handles
    pub fn with_parts(config: Config, db: Arc<Database>, media: Arc<dyn MediaStore>) -> Self {
        Core { config, db, media }
    }

    /// Start the HTTP API server (returns after graceful shutdown)
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!("Starting API server on {}", addr);
        api::serve(addr, &self.config, self.db.clone(), self.media.clone()).await
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Get the media store
    pub fn media(&self) -> &Arc<dyn MediaStore> {
        &self.media
    }
}
