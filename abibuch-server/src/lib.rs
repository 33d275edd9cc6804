//! abibuch-server library interface
//!
//! Exposes the application state and router so integration tests can drive
//! the full HTTP surface without binding a socket.

pub mod api;
pub mod audit;
pub mod auth;
pub mod db;
pub mod deadline;
pub mod error;
pub mod export;
pub mod import;
pub mod pagination;
pub mod ranking;

pub use crate::error::{ApiError, ApiResult};

use std::path::PathBuf;
use std::sync::Arc;

use abibuch_common::config::TomlConfig;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::Router;
use axum_extra::extract::cookie::Key;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Effective configuration
    pub config: Arc<TomlConfig>,
    /// Signing key for the admin alias cookie
    pub cookie_key: Key,
    /// Directory holding uploaded photo files
    pub uploads_dir: PathBuf,
    /// Service startup timestamp
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: TomlConfig, uploads_dir: PathBuf) -> Self {
        let cookie_key = derive_cookie_key(config.cookie_secret.as_deref());
        Self {
            db,
            config: Arc::new(config),
            cookie_key,
            uploads_dir,
            startup_time: Utc::now(),
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Cookie signing key
///
/// A configured secret is stretched to 64 bytes with SHA-512 so signed
/// cookies survive restarts. Without one, cookies are valid for the lifetime
/// of the process only.
pub fn derive_cookie_key(secret: Option<&str>) -> Key {
    match secret.filter(|s| !s.is_empty()) {
        Some(secret) => {
            let digest = Sha512::digest(secret.as_bytes());
            Key::from(digest.as_slice())
        }
        None => Key::generate(),
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    // Photo uploads are checked against max_upload_bytes inside the handler
    // so the client gets a JSON 413; the outer limit only caps runaway bodies.
    let body_limit = state.config.max_upload_bytes().saturating_add(1024 * 1024);

    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::deadline_routes())
        .merge(api::candidate_routes())
        .merge(api::profile_routes())
        .merge(api::ranking_routes())
        .merge(api::quote_routes())
        .merge(api::comment_routes())
        .merge(api::photo_routes())
        .merge(api::admin::admin_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
