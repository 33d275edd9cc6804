//! Admin endpoints
//!
//! Reads need an [`AdminUser`](crate::auth::AdminUser); every mutation takes
//! an [`AdminActor`](crate::auth::AdminActor) and writes its audit entry in
//! the same transaction as the change.

pub mod accounts;
pub mod activity;
pub mod audit;
pub mod export;
pub mod fields;
pub mod import;
pub mod moderation;
pub mod photos;
pub mod profiles;
pub mod questions;
pub mod rankings;
pub mod students;
pub mod teachers;

use std::collections::HashSet;

use axum::{routing::post, Router};

use super::alias::{clear_alias, get_alias, set_alias};
use super::path_guid;
use crate::{ApiError, ApiResult, AppState};

/// Every admin route, including the alias endpoints
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/alias",
            post(set_alias).get(get_alias).delete(clear_alias),
        )
        .merge(students::student_routes())
        .merge(teachers::teacher_routes())
        .merge(questions::question_routes())
        .merge(fields::field_routes())
        .merge(accounts::account_routes())
        .merge(profiles::profile_routes())
        .merge(rankings::ranking_routes())
        .merge(moderation::moderation_routes())
        .merge(photos::photo_routes())
        .merge(import::import_routes())
        .merge(export::export_routes())
        .merge(audit::audit_routes())
        .merge(activity::activity_routes())
}

#[derive(Debug, serde::Deserialize)]
pub struct ReorderRequest {
    pub order: Vec<String>,
}

/// Check `requested` names every guid of `current` exactly once
///
/// Returns the normalized order.
pub(crate) fn check_permutation(current: &[String], requested: &[String]) -> ApiResult<Vec<String>> {
    let invalid = || {
        ApiError::BadRequest(
            "Order must list every existing entry exactly once".to_string(),
        )
    };

    if current.len() != requested.len() {
        return Err(invalid());
    }

    let known: HashSet<&str> = current.iter().map(String::as_str).collect();
    let mut seen = HashSet::with_capacity(requested.len());
    let mut order = Vec::with_capacity(requested.len());
    for raw in requested {
        let guid = path_guid(raw).map_err(|_| invalid())?;
        if !known.contains(guid.as_str()) || !seen.insert(guid.clone()) {
            return Err(invalid());
        }
        order.push(guid);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guids(n: usize) -> Vec<String> {
        (0..n).map(|_| abibuch_common::uuid_utils::generate()).collect()
    }

    #[test]
    fn test_permutation_accepted() {
        let current = guids(3);
        let requested = vec![
            current[2].to_uppercase(),
            current[0].clone(),
            current[1].clone(),
        ];
        let order = check_permutation(&current, &requested).unwrap();
        assert_eq!(order, vec![current[2].clone(), current[0].clone(), current[1].clone()]);
    }

    #[test]
    fn test_permutation_rejects_missing_duplicate_and_unknown() {
        let current = guids(3);
        assert!(check_permutation(&current, &current[..2]).is_err());

        let duplicated = vec![current[0].clone(), current[0].clone(), current[1].clone()];
        assert!(check_permutation(&current, &duplicated).is_err());

        let unknown = vec![current[0].clone(), current[1].clone(), guids(1).remove(0)];
        assert!(check_permutation(&current, &unknown).is_err());

        let garbage = vec![current[0].clone(), current[1].clone(), "x".to_string()];
        assert!(check_permutation(&current, &garbage).is_err());
    }
}
