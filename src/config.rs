//! Configuration management for MessVerse
//!
//! Settings come from an optional TOML file, then environment variables
//! (a `.env` file is honoured by the binary), then CLI flags.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Metadata store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Media host credentials and upload layout
    #[serde(default)]
    pub media: MediaConfig,

    /// Rate limiting for mutating routes
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Upload constraints
    #[serde(default)]
    pub upload: UploadConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 10000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins: "*" or a comma-separated list
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Shared secret for mutating routes, sent as `X-MV-KEY`.
    /// When unset, mutating routes are open.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_port() -> u16 {
    10000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            cors_origin: default_cors_origin(),
            api_key: None,
        }
    }
}

impl ServerConfig {
    /// The configured key, treating an empty or blank value as unset
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    /// Parsed CORS origins; `None` means any origin
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let raw = self.cors_origin.trim();
        if raw.is_empty() || raw == "*" {
            return None;
        }
        Some(
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string: a file path, optionally prefixed with `sqlite://`,
    /// or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "messverse.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: default_database_url(),
        }
    }
}

impl DatabaseConfig {
    /// Resolve the connection string to a filesystem path (`None` for in-memory)
    pub fn path(&self) -> Option<PathBuf> {
        let url = self.url.trim();
        let stripped = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        if stripped == ":memory:" {
            return None;
        }
        Some(expand_path(Path::new(stripped)))
    }
}

/// Media host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub cloud_name: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    /// Base URL of the upload API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Top-level folder; portraits go to `{root}/members`, memories to `{root}/memories`
    #[serde(default = "default_folder_root")]
    pub folder_root: String,

    /// Per-request timeout for media host calls
    #[serde(default = "default_media_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_folder_root() -> String {
    "mess_verse".to_string()
}

fn default_media_timeout() -> u64 {
    120
}

impl Default for MediaConfig {
    fn default() -> Self {
        MediaConfig {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            api_base: default_api_base(),
            folder_root: default_folder_root(),
            timeout_secs: default_media_timeout(),
        }
    }
}

impl MediaConfig {
    /// Fail when any credential is blank
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("CLOUDINARY_CLOUD_NAME", &self.cloud_name),
            ("CLOUDINARY_API_KEY", &self.api_key),
            ("CLOUDINARY_API_SECRET", &self.api_secret),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Config(format!(
                "Missing media credentials: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn members_folder(&self) -> String {
        format!("{}/members", self.folder_root)
    }

    pub fn memories_folder(&self) -> String {
        format!("{}/memories", self.folder_root)
    }
}

/// Fixed-window rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Requests allowed per client per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// How often expired buckets are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Key clients by the first `X-Forwarded-For` hop instead of the peer address.
    /// Only enable behind a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    30
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
            sweep_interval_secs: default_sweep_interval(),
            trust_forwarded_for: false,
        }
    }
}

/// Upload constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted image size in bytes (default: 10 MiB)
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

fn default_max_file_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(CoreError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("messverse.toml")
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], self.server.port)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!("Ignoring invalid PORT {:?}: {}", port, e),
            }
        }
        if let Some(origin) = var("CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Some(key) = var("MV_API_KEY") {
            let key = key.trim().to_string();
            self.server.api_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(name) = var("CLOUDINARY_CLOUD_NAME") {
            self.media.cloud_name = name;
        }
        if let Some(key) = var("CLOUDINARY_API_KEY") {
            self.media.api_key = key;
        }
        if let Some(secret) = var("CLOUDINARY_API_SECRET") {
            self.media.api_secret = secret;
        }
        if let Some(base) = var("CLOUDINARY_API_BASE") {
            self.media.api_base = base;
        }
        if let Some(window) = var("MV_RATE_LIMIT_WINDOW_SECS") {
            match window.trim().parse() {
                Ok(window) => self.rate_limit.window_secs = window,
                Err(e) => tracing::warn!("Ignoring invalid MV_RATE_LIMIT_WINDOW_SECS: {}", e),
            }
        }
        if let Some(max) = var("MV_RATE_LIMIT_MAX") {
            match max.trim().parse() {
                Ok(max) => self.rate_limit.max_requests = max,
                Err(e) => tracing::warn!("Ignoring invalid MV_RATE_LIMIT_MAX: {}", e),
            }
        }
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# MessVerse Configuration
# Every value here can also be set through the environment variable noted next to it.

[server]
port = 10000            # PORT
host = "0.0.0.0"        # HOST

# "*" allows any origin, otherwise a comma-separated list   # CORS_ORIGIN
cors_origin = "*"

# Shared secret for uploads and deletes, sent as the X-MV-KEY header.
# Leave unset to keep mutating routes open (local development).   # MV_API_KEY
# api_key = "your-secret-key"

[database]
url = "messverse.db"    # DATABASE_URL

[media]
cloud_name = ""         # CLOUDINARY_CLOUD_NAME
api_key = ""            # CLOUDINARY_API_KEY
api_secret = ""         # CLOUDINARY_API_SECRET
folder_root = "mess_verse"
timeout_secs = 120

[rate_limit]
window_secs = 60        # MV_RATE_LIMIT_WINDOW_SECS
max_requests = 30       # MV_RATE_LIMIT_MAX
sweep_interval_secs = 300
trust_forwarded_for = false

[upload]
max_file_bytes = 10485760
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
