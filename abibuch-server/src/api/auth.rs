//! Login, logout and session introspection

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{removal_cookie, session_cookie, session_token, CurrentUser};
use crate::db::{accounts, students};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Logged-in user as returned by login and `/me`
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub guid: String,
    pub username: String,
    pub role: abibuch_common::models::Role,
    pub student_guid: Option<String>,
    /// Name of the linked student, if any
    pub display_name: Option<String>,
}

async fn me_response(state: &AppState, user: CurrentUser) -> ApiResult<MeResponse> {
    let display_name = match &user.student_guid {
        Some(guid) => students::find(&state.db, guid).await?.map(|s| s.display_name()),
        None => None,
    };

    Ok(MeResponse {
        guid: user.guid,
        username: user.username,
        role: user.role,
        student_guid: user.student_guid,
        display_name,
    })
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<MeResponse>)> {
    let username = req.username.trim();

    let Some(account) = accounts::verify_credentials(&state.db, username, &req.password).await? else {
        warn!("Failed login for '{}'", username);
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };

    let token =
        accounts::create_session(&state.db, &account.guid, state.config.session_ttl_hours()).await?;
    info!("Login: {} ({})", account.username, account.role);

    let user = CurrentUser {
        guid: account.guid,
        username: account.username,
        role: account.role,
        student_guid: account.student_guid,
    };
    let body = me_response(&state, user).await?;

    Ok((jar.add(session_cookie(token)), Json(body)))
}

/// POST /api/auth/logout
///
/// Succeeds even without a session so clients can always clear cookies.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> ApiResult<(CookieJar, StatusCode)> {
    if let Some(token) = session_token(&jar) {
        accounts::delete_session(&state.db, &token).await?;
    }

    Ok((jar.remove(removal_cookie()), StatusCode::NO_CONTENT))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<MeResponse>> {
    Ok(Json(me_response(&state, user).await?))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}
