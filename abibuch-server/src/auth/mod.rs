//! Request authentication
//!
//! Students and admins log in with username and password and receive an
//! opaque `abibuch_session` cookie backed by the `sessions` table. Handlers
//! declare what they need through extractors:
//!
//! - [`CurrentUser`]: any logged-in account
//! - [`StudentUser`]: a student account linked to a student record
//! - [`AdminUser`]: an admin account
//! - [`AdminActor`]: an admin account plus a valid alias cookie, required
//!   for every admin mutation so the audit log can attribute it

pub mod alias;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite, SignedCookieJar};
use abibuch_common::models::Role;
use serde::Serialize;

use crate::{ApiError, AppState};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "abibuch_session";

/// Logged-in account resolved from the session cookie
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CurrentUser {
    pub guid: String,
    pub username: String,
    pub role: Role,
    pub student_guid: Option<String>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Build the session cookie for a freshly created session
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie used to clear the session cookie on logout
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Read the raw session token from request headers
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let token = session_token(&jar)
            .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

        let user = crate::db::accounts::find_session_user(
            &state.db,
            &token,
            abibuch_common::time::now(),
        )
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".to_string()))?;

        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Student account with its linked student record
#[derive(Debug, Clone)]
pub struct StudentUser {
    pub user: CurrentUser,
    pub student_guid: String,
}

#[async_trait]
impl FromRequestParts<AppState> for StudentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        match (&user.role, user.student_guid.clone()) {
            (Role::Student, Some(student_guid)) => Ok(StudentUser { user, student_guid }),
            _ => Err(ApiError::Forbidden(
                "This action is only available to students".to_string(),
            )),
        }
    }
}

/// Admin account
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

/// Admin account acting under a self-assigned alias
#[derive(Debug, Clone)]
pub struct AdminActor {
    pub user: CurrentUser,
    pub alias: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AdminUser(user) = AdminUser::from_request_parts(parts, state).await?;

        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let current = alias::current_alias(&jar, abibuch_common::time::now())
            .ok_or(ApiError::AliasRequired)?;

        Ok(AdminActor {
            user,
            alias: current.alias,
        })
    }
}
