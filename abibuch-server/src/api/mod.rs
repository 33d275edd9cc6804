//! HTTP API handlers
//!
//! Student and shared endpoints live here; admin endpoints live in
//! [`admin`]. Every module exposes a `*_routes()` function merged by
//! [`crate::build_router`].

pub mod admin;
pub mod alias;
pub mod auth;
pub mod candidates;
pub mod comments;
pub mod deadline;
pub mod health;
pub mod photos;
pub mod profile;
pub mod quotes;
pub mod ranking;

pub use auth::auth_routes;
pub use candidates::candidate_routes;
pub use comments::comment_routes;
pub use deadline::deadline_routes;
pub use health::health_routes;
pub use photos::photo_routes;
pub use profile::profile_routes;
pub use quotes::quote_routes;
pub use ranking::ranking_routes;

use abibuch_common::uuid_utils;

use crate::{ApiError, ApiResult};

/// Normalize a guid from the URL path
pub(crate) fn path_guid(raw: &str) -> ApiResult<String> {
    uuid_utils::normalize(raw).ok_or_else(|| ApiError::NotFound(format!("No such id '{}'", raw)))
}

/// Trim `value` and check it is non-empty and at most `max` characters
pub(crate) fn required_text(value: &str, name: &str, max: usize) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", name)));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            name, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional value; blank becomes `None`
pub(crate) fn optional_text(value: Option<&str>, name: &str, max: usize) -> ApiResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => required_text(v, name, max).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("  Anna ", "name", 10).unwrap(), "Anna");
        assert!(required_text("   ", "name", 10).is_err());
        assert!(required_text("ääääää", "name", 6).is_ok());
        assert!(required_text("ääääääa", "name", 6).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(None, "x", 5).unwrap(), None);
        assert_eq!(optional_text(Some("  "), "x", 5).unwrap(), None);
        assert_eq!(optional_text(Some(" Mathe "), "x", 5).unwrap().as_deref(), Some("Mathe"));
        assert!(optional_text(Some("Mathematik"), "x", 5).is_err());
    }

    #[test]
    fn test_path_guid() {
        assert!(path_guid("not-a-guid").is_err());
        let guid = uuid_utils::generate();
        assert_eq!(path_guid(&guid.to_uppercase()).unwrap(), guid);
    }
}
