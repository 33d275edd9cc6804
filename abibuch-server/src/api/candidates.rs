//! Autocomplete search over students and teachers

use abibuch_common::models::{Gender, PersonKind};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::db::{students, teachers};
use crate::{ApiResult, AppState};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CandidateQuery {
    pub kind: PersonKind,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub guid: String,
    pub kind: PersonKind,
    pub name: String,
    pub gender: Gender,
    #[serde(skip)]
    search_terms: Vec<String>,
}

impl Candidate {
    fn matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.search_terms.iter().any(|t| t.contains(needle))
    }
}

/// Effective result limit
fn clamp_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Filter already name-sorted candidates by case-insensitive substring
fn search(candidates: Vec<Candidate>, q: Option<&str>, limit: usize) -> Vec<Candidate> {
    let needle = q.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    candidates
        .into_iter()
        .filter(|c| c.matches(&needle))
        .take(limit)
        .collect()
}

/// GET /api/candidates?kind=STUDENT|TEACHER&q=&limit=
pub async fn list_candidates(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<CandidateQuery>,
) -> ApiResult<Json<Vec<Candidate>>> {
    let candidates: Vec<Candidate> = match query.kind {
        PersonKind::Student => students::list(&state.db)
            .await?
            .into_iter()
            .map(|s| Candidate {
                name: s.display_name(),
                search_terms: vec![
                    s.first_name.to_lowercase(),
                    s.last_name.to_lowercase(),
                    s.display_name().to_lowercase(),
                ],
                guid: s.guid,
                kind: PersonKind::Student,
                gender: s.gender,
            })
            .collect(),
        PersonKind::Teacher => teachers::list(&state.db)
            .await?
            .into_iter()
            .map(|t| {
                let mut terms = vec![t.last_name.to_lowercase(), t.display_name().to_lowercase()];
                if let Some(first) = &t.first_name {
                    terms.push(first.to_lowercase());
                    terms.push(format!("{} {}", first, t.last_name).to_lowercase());
                }
                Candidate {
                    name: t.display_name(),
                    search_terms: terms,
                    guid: t.guid,
                    kind: PersonKind::Teacher,
                    gender: t.gender,
                }
            })
            .collect(),
    };

    Ok(Json(search(candidates, query.q.as_deref(), clamp_limit(query.limit))))
}

pub fn candidate_routes() -> Router<AppState> {
    Router::new().route("/api/candidates", get(list_candidates))
}
