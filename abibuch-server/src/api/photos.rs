//! Photo upload and download endpoints

use std::path::Path as FsPath;

use abibuch_common::models::PhotoCategory;
use abibuch_common::time::now;
use abibuch_common::uuid_utils;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, warn};

use super::path_guid;
use crate::auth::{CurrentUser, StudentUser};
use crate::db::photos::{self, Photo};
use crate::{deadline, ApiError, ApiResult, AppState};

/// File extension for an accepted image content type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_lowercase();
    match essence.as_str() {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Remove stored photo files, logging failures
///
/// Runs after the database change committed; a leftover file is harmless.
pub(crate) async fn remove_files(uploads_dir: &FsPath, file_names: &[String]) {
    for name in file_names {
        let path = uploads_dir.join(name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove photo file {}: {}", path.display(), e);
            }
        }
    }
}

/// PUT /api/photos/:category
///
/// Body is the raw image. PORTRAIT and CHILDHOOD replace the previous photo.
pub async fn upload_photo(
    State(state): State<AppState>,
    student: StudentUser,
    Path(category): Path<PhotoCategory>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Photo>)> {
    deadline::ensure_open(&state.db).await?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let ext = extension_for(content_type).ok_or_else(|| {
        ApiError::UnsupportedMediaType(format!(
            "Photos must be JPEG, PNG or WebP, not '{}'",
            content_type
        ))
    })?;

    if body.is_empty() {
        return Err(ApiError::BadRequest("Photo is empty".to_string()));
    }
    let limit = state.config.max_upload_bytes();
    if body.len() > limit {
        return Err(ApiError::PayloadTooLarge(format!(
            "Photos may be at most {} bytes",
            limit
        )));
    }

    let guid = uuid_utils::generate();
    let photo = Photo {
        file_name: format!("{}.{}", guid, ext),
        guid,
        student_guid: student.student_guid.clone(),
        category,
        content_type: content_type.split(';').next().unwrap_or_default().trim().to_lowercase(),
        size_bytes: body.len() as i64,
        created_at: now(),
    };

    let path = state.uploads_dir.join(&photo.file_name);
    tokio::fs::write(&path, &body).await?;

    let max_free = state.config.max_free_photos();
    let saved: ApiResult<Vec<String>> = async {
        // Each branch writes first, so the transaction holds the write lock
        // before it reads and concurrent uploads of one student serialize
        let mut tx = state.db.begin().await?;
        let replaced = if category.is_single() {
            let replaced = photos::delete_in_category(&mut *tx, &photo.student_guid, category).await?;
            photos::insert(&mut *tx, &photo).await?;
            replaced
        } else {
            photos::insert(&mut *tx, &photo).await?;
            if photos::count_in_category(&mut *tx, &photo.student_guid, category).await? > max_free {
                return Err(ApiError::Conflict(format!(
                    "At most {} free photos allowed",
                    max_free
                )));
            }
            Vec::new()
        };
        tx.commit().await?;
        Ok(replaced)
    }
    .await;

    let replaced = match saved {
        Ok(replaced) => replaced,
        Err(e) => {
            remove_files(&state.uploads_dir, std::slice::from_ref(&photo.file_name)).await;
            return Err(e);
        }
    };

    remove_files(&state.uploads_dir, &replaced).await;
    info!(
        "Photo {} ({}, {} bytes) uploaded by {}",
        photo.guid, category, photo.size_bytes, student.user.username
    );

    Ok((StatusCode::CREATED, Json(photo)))
}

/// GET /api/photos/mine
pub async fn my_photos(State(state): State<AppState>, student: StudentUser) -> ApiResult<Json<Vec<Photo>>> {
    Ok(Json(photos::list(&state.db, Some(&student.student_guid)).await?))
}

/// DELETE /api/photos/:guid
pub async fn delete_own_photo(
    State(state): State<AppState>,
    student: StudentUser,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    deadline::ensure_open(&state.db).await?;

    let guid = path_guid(&guid)?;
    let photo = photos::find(&state.db, &guid)
        .await?
        .filter(|p| p.student_guid == student.student_guid)
        .ok_or_else(|| ApiError::NotFound(format!("Photo {}", guid)))?;

    photos::delete(&state.db, &photo.guid).await?;
    remove_files(&state.uploads_dir, &[photo.file_name]).await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/photos/:guid/file
///
/// Other students get 404 rather than 403 so photo ids do not leak.
pub async fn photo_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(guid): Path<String>,
) -> ApiResult<Response> {
    let guid = path_guid(&guid)?;
    let photo = photos::find(&state.db, &guid)
        .await?
        .filter(|p| user.is_admin() || user.student_guid.as_deref() == Some(p.student_guid.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("Photo {}", guid)))?;

    let bytes = match tokio::fs::read(state.uploads_dir.join(&photo.file_name)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Photo {} has no file on disk", photo.guid);
            return Err(ApiError::NotFound(format!("Photo file {}", photo.guid)));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (header::CONTENT_TYPE, photo.content_type),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        bytes,
    )
        .into_response())
}

pub fn photo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/photos/mine", get(my_photos))
        // PUT takes a category, DELETE a photo guid; axum needs one parameter name
        .route("/api/photos/:id", put(upload_photo).delete(delete_own_photo))
        .route("/api/photos/:id/file", get(photo_file))
}
