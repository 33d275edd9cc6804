//! Profile review for admins

use abibuch_common::models::{AuditAction, SubmissionStatus};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::path_guid;
use crate::api::profile::{load_view, ProfileView};
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::profiles::{self, ProfileOverview};
use crate::db::students;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    #[serde(default)]
    pub status: Option<SubmissionStatus>,
}

/// GET /api/admin/profiles?status=
pub async fn list_profiles(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<OverviewQuery>,
) -> ApiResult<Json<Vec<ProfileOverview>>> {
    Ok(Json(profiles::overview(&state.db, query.status).await?))
}

/// GET /api/admin/profiles/:student_guid
pub async fn get_profile(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(student_guid): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    let student_guid = path_guid(&student_guid)?;
    if students::find(&state.db, &student_guid).await?.is_none() {
        return Err(ApiError::NotFound(format!("Student {}", student_guid)));
    }

    Ok(Json(load_view(&state.db, &student_guid).await?))
}

/// POST /api/admin/profiles/:student_guid/reopen
///
/// Puts a submitted profile back into DRAFT so the student can edit it.
pub async fn reopen_profile(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(student_guid): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    let student_guid = path_guid(&student_guid)?;
    let student = students::find(&state.db, &student_guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Student {}", student_guid)))?;

    let before = profiles::state(&state.db, &student_guid).await?;
    if before.status != SubmissionStatus::Submitted {
        return Err(ApiError::Conflict("Profile is not submitted".to_string()));
    }

    let mut tx = state.db.begin().await?;
    profiles::set_status(&mut *tx, &student_guid, SubmissionStatus::Draft).await?;
    let after = profiles::state(&mut *tx, &student_guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Update,
            entity::PROFILE,
            format!("Reopened profile of {}", student.display_name()),
        )
        .entity(&student_guid)
        .before(&before)
        .after(&after),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(load_view(&state.db, &student_guid).await?))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/profiles", get(list_profiles))
        .route("/api/admin/profiles/:student_guid", get(get_profile))
        .route("/api/admin/profiles/:student_guid/reopen", post(reopen_profile))
}
