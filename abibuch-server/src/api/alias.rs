//! Admin alias endpoints

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::alias::{self, AdminAlias};
use crate::auth::AdminUser;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SetAliasRequest {
    pub alias: String,
}

#[derive(Debug, Serialize)]
pub struct AliasResponse {
    pub alias: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Option<AdminAlias>> for AliasResponse {
    fn from(current: Option<AdminAlias>) -> Self {
        match current {
            Some(a) => AliasResponse {
                alias: Some(a.alias),
                expires_at: Some(a.expires_at),
            },
            None => AliasResponse {
                alias: None,
                expires_at: None,
            },
        }
    }
}

/// POST /api/admin/alias
pub async fn set_alias(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    jar: SignedCookieJar,
    Json(req): Json<SetAliasRequest>,
) -> ApiResult<(SignedCookieJar, Json<AliasResponse>)> {
    let name = alias::validate_alias(&req.alias)?;
    let (cookie, current) = alias::alias_cookie(&name, state.config.alias_ttl_minutes());

    info!("Admin {} now acting as '{}'", user.username, name);

    Ok((jar.add(cookie), Json(Some(current).into())))
}

/// GET /api/admin/alias
pub async fn get_alias(_admin: AdminUser, jar: SignedCookieJar) -> Json<AliasResponse> {
    Json(alias::current_alias(&jar, abibuch_common::time::now()).into())
}

/// DELETE /api/admin/alias
pub async fn clear_alias(_admin: AdminUser, jar: SignedCookieJar) -> (SignedCookieJar, StatusCode) {
    (jar.remove(alias::removal_cookie()), StatusCode::NO_CONTENT)
}
