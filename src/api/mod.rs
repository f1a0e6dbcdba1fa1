//! HTTP API module for MessVerse
//!
//! Provides REST endpoints for member portraits and gallery memories.

mod auth;
mod error;
pub mod rate_limit;
pub mod routes;

pub use auth::API_KEY_HEADER;
pub use rate_limit::{FixedWindowLimiter, RateDecision};

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::handlers::{MemoryService, PortraitService};
use crate::media::MediaStore;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub portraits: PortraitService,
    pub memories: MemoryService,
    /// Shared secret for mutating routes (None = open)
    pub api_key: Option<String>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub trust_forwarded_for: bool,
    pub max_file_bytes: usize,
}

impl AppState {
    pub fn new(config: &Config, db: Arc<Database>, media: Arc<dyn MediaStore>) -> Self {
        AppState {
            portraits: PortraitService::new(
                db.clone(),
                media.clone(),
                config.media.members_folder(),
            ),
            memories: MemoryService::new(db, media, config.media.memories_folder()),
            api_key: config.server.effective_api_key(),
            limiter: Arc::new(FixedWindowLimiter::new(
                Duration::from_secs(config.rate_limit.window_secs),
                config.rate_limit.max_requests,
            )),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
            max_file_bytes: config.upload.max_file_bytes,
        }
    }
}

/// Start the HTTP API server
pub async fn serve(
    addr: SocketAddr,
    config: &Config,
    db: Arc<Database>,
    media: Arc<dyn MediaStore>,
) -> Result<()> {
    let state = AppState::new(config, db, media);

    if state.api_key.is_none() {
        tracing::warn!("No API key configured: uploads and deletes are open to any client");
    }

    let sweeper = rate_limit::spawn_sweeper(
        state.limiter.clone(),
        Duration::from_secs(config.rate_limit.sweep_interval_secs.max(1)),
    );

    let app = create_router(state, config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| crate::error::CoreError::Api(e.to_string()));

    sweeper.abort();
    result
}

/// CORS configuration from the `cors_origin` setting
fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-mv-key"),
        ]);

    match config.server.cors_origins() {
        None => cors.allow_origin(Any),
        Some(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            cors.allow_origin(AllowOrigin::list(values))
        }
    }
}

/// Create the API router with all routes
pub fn create_router(state: AppState, config: &Config) -> Router {
    // Read-only routes, open to everyone
    let public_routes = Router::new()
        .route("/member-portraits", get(routes::list_portraits))
        .route("/memories", get(routes::list_memories));

    // Mutating routes: rate limit first, then the key check
    let guarded_routes = Router::new()
        .route("/member-portraits", post(routes::upload_portrait))
        .route("/memories", post(routes::upload_memory))
        .route("/memories/:id", delete(routes::delete_memory))
        .layer(DefaultBodyLimit::max(
            state.max_file_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        // route_layer keeps the method-not-allowed fallback outside both gates
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ));

    let api_routes = public_routes.merge(guarded_routes);

    Router::new()
        // Health check (public, no auth required)
        .route("/health", get(routes::health))
        .nest("/api", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
