//! Admin alias cookie
//!
//! Admins share accounts, so each one picks an alias before changing
//! anything. The alias lives in a signed cookie whose value is
//! `alias|expires_unix`; the server rejects it once the embedded expiry has
//! passed, independent of what the browser does with the cookie.

use abibuch_common::time::now;
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::ApiError;

/// Name of the alias cookie
pub const ALIAS_COOKIE: &str = "abibuch_admin_alias";

const MIN_ALIAS_LEN: usize = 2;
const MAX_ALIAS_LEN: usize = 32;

/// Alias currently attached to the admin's browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminAlias {
    pub alias: String,
    pub expires_at: DateTime<Utc>,
}

/// Trim and check an alias
///
/// Allowed: 2-32 ASCII letters, digits, `-`, `_` and `.`.
pub fn validate_alias(raw: &str) -> Result<String, ApiError> {
    let alias = raw.trim();
    let len = alias.chars().count();

    if !(MIN_ALIAS_LEN..=MAX_ALIAS_LEN).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "Alias must be between {} and {} characters",
            MIN_ALIAS_LEN, MAX_ALIAS_LEN
        )));
    }

    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ApiError::BadRequest(
            "Alias may only contain letters, digits, '-', '_' and '.'".to_string(),
        ));
    }

    Ok(alias.to_string())
}

/// Serialize alias and expiry into the cookie value
pub fn encode_value(alias: &str, expires_at: DateTime<Utc>) -> String {
    format!("{}|{}", alias, expires_at.timestamp())
}

/// Parse a cookie value, returning `None` when malformed or expired
pub fn decode_value(value: &str, now: DateTime<Utc>) -> Option<AdminAlias> {
    let (alias, expires) = value.rsplit_once('|')?;
    let alias = validate_alias(alias).ok()?;
    let expires_at = DateTime::<Utc>::from_timestamp(expires.parse::<i64>().ok()?, 0)?;

    if expires_at <= now {
        return None;
    }

    Some(AdminAlias { alias, expires_at })
}

/// Alias from a signed jar; tampered cookies fail signature verification
pub fn current_alias(jar: &SignedCookieJar, now: DateTime<Utc>) -> Option<AdminAlias> {
    jar.get(ALIAS_COOKIE)
        .and_then(|cookie| decode_value(cookie.value(), now))
}

/// Build the alias cookie valid for `ttl_minutes`
pub fn alias_cookie(alias: &str, ttl_minutes: i64) -> (Cookie<'static>, AdminAlias) {
    let expires_at = now() + Duration::minutes(ttl_minutes);
    let cookie = Cookie::build((ALIAS_COOKIE, encode_value(alias, expires_at)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();

    (
        cookie,
        AdminAlias {
            alias: alias.to_string(),
            expires_at,
        },
    )
}

/// Cookie used to clear the alias
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(ALIAS_COOKIE).path("/").build()
}
