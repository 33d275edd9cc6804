//! Audit log browsing

use abibuch_common::models::AuditAction;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::audit::{group_entries, AuditGroup};
use crate::auth::AdminUser;
use crate::db::audit::{self, AliasCount, AuditFilter};
use crate::pagination::{Pagination, AUDIT_PAGE_SIZE};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub entity_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuditPage {
    pub pagination: Pagination,
    pub groups: Vec<AuditGroup>,
}

/// GET /api/admin/audit?page&alias&action&entity_type
///
/// Grouping runs within the page, so a group can continue on the next page.
pub async fn list_audit(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<AuditPage>> {
    let filter = AuditFilter {
        alias: query.alias.filter(|a| !a.trim().is_empty()),
        action: query.action,
        entity_type: query.entity_type.filter(|e| !e.trim().is_empty()),
    };

    let total = audit::count(&state.db, &filter).await?;
    let pagination = Pagination::new(total, query.page.unwrap_or(1), AUDIT_PAGE_SIZE);
    let entries = audit::list(&state.db, &filter, pagination.page_size, pagination.offset).await?;

    let window = chrono::Duration::minutes(state.config.audit_group_window_minutes());
    Ok(Json(AuditPage {
        pagination,
        groups: group_entries(entries, window),
    }))
}

/// GET /api/admin/audit/aliases
pub async fn list_aliases(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<AliasCount>>> {
    Ok(Json(audit::aliases(&state.db).await?))
}

pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/audit", get(list_audit))
        .route("/api/admin/audit/aliases", get(list_aliases))
}
