//! Photo overview and removal for admins

use abibuch_common::models::AuditAction;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use crate::api::path_guid;
use crate::api::photos::remove_files;
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::photos::{self, Photo};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PhotoQuery {
    #[serde(default)]
    pub student_guid: Option<String>,
}

/// GET /api/admin/photos?student_guid=
pub async fn list_photos(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<PhotoQuery>,
) -> ApiResult<Json<Vec<Photo>>> {
    let student = match query.student_guid.as_deref() {
        Some(raw) => Some(path_guid(raw)?),
        None => None,
    };

    Ok(Json(photos::list(&state.db, student.as_deref()).await?))
}

/// DELETE /api/admin/photos/:guid
pub async fn delete_photo(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    let guid = path_guid(&guid)?;
    let photo = photos::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Photo {}", guid)))?;

    let mut tx = state.db.begin().await?;
    photos::delete(&mut *tx, &guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Delete,
            entity::PHOTO,
            format!("Deleted {} photo {}", photo.category, photo.guid),
        )
        .entity(&guid)
        .before(&photo),
    )
    .await?;
    tx.commit().await?;

    remove_files(&state.uploads_dir, &[photo.file_name]).await;
    Ok(StatusCode::NO_CONTENT)
}

pub fn photo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/photos", get(list_photos))
        .route("/api/admin/photos/:guid", delete(delete_photo))
}
