//! Steckbrief endpoints for students

use std::collections::HashMap;

use abibuch_common::models::{FieldType, SubmissionStatus};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::StudentUser;
use crate::db::{fields, photos, profiles};
use crate::{deadline, ApiError, ApiResult, AppState};

/// One field with the student's value
#[derive(Debug, Serialize)]
pub struct FieldValue {
    pub field_guid: String,
    pub label: String,
    pub field_type: FieldType,
    pub max_length: i64,
    pub required: bool,
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub student_guid: String,
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fields: Vec<FieldValue>,
    pub photos: Vec<photos::Photo>,
}

/// Profile of one student with all fields in order
pub(crate) async fn load_view(pool: &SqlitePool, student_guid: &str) -> ApiResult<ProfileView> {
    let state = profiles::state(pool, student_guid).await?;
    let mut values = profiles::values(pool, student_guid).await?;

    let fields = fields::list(pool)
        .await?
        .into_iter()
        .map(|f| FieldValue {
            value: values.remove(&f.guid),
            field_guid: f.guid,
            label: f.label,
            field_type: f.field_type,
            max_length: f.max_length,
            required: f.required,
        })
        .collect();

    Ok(ProfileView {
        student_guid: student_guid.to_string(),
        status: state.status,
        submitted_at: state.submitted_at,
        updated_at: state.updated_at,
        fields,
        photos: photos::list(pool, Some(student_guid)).await?,
    })
}

/// GET /api/profile
pub async fn get_profile(State(state): State<AppState>, student: StudentUser) -> ApiResult<Json<ProfileView>> {
    Ok(Json(load_view(&state.db, &student.student_guid).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// Field guid to text; empty text clears the field
    pub values: HashMap<String, String>,
}

/// PUT /api/profile
///
/// Partial update: fields not mentioned keep their value.
pub async fn update_profile(
    State(state): State<AppState>,
    student: StudentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileView>> {
    deadline::ensure_open(&state.db).await?;

    let current = profiles::state(&state.db, &student.student_guid).await?;
    if current.status == SubmissionStatus::Submitted {
        return Err(ApiError::Conflict(
            "Profile is already submitted".to_string(),
        ));
    }

    let known: HashMap<String, abibuch_common::models::ProfileField> = fields::list(&state.db)
        .await?
        .into_iter()
        .map(|f| (f.guid.clone(), f))
        .collect();

    // Validate everything before writing anything
    let mut changes: Vec<(String, Option<String>)> = Vec::with_capacity(req.values.len());
    for (raw_guid, value) in &req.values {
        let field = abibuch_common::uuid_utils::normalize(raw_guid)
            .and_then(|guid| known.get(&guid))
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown field '{}'", raw_guid)))?;

        let value = value.trim();
        if value.chars().count() as i64 > field.max_length {
            return Err(ApiError::BadRequest(format!(
                "'{}' must be at most {} characters",
                field.label, field.max_length
            )));
        }

        let value = (!value.is_empty()).then(|| value.to_string());
        changes.push((field.guid.clone(), value));
    }

    let mut tx = state.db.begin().await?;
    for (field_guid, value) in &changes {
        match value {
            Some(text) => profiles::set_value(&mut *tx, &student.student_guid, field_guid, text).await?,
            None => profiles::clear_value(&mut *tx, &student.student_guid, field_guid).await?,
        }
    }
    profiles::touch(&mut *tx, &student.student_guid).await?;
    // A submit that committed meanwhile wins; dropping tx rolls back
    if profiles::state(&mut *tx, &student.student_guid).await?.status == SubmissionStatus::Submitted {
        return Err(ApiError::Conflict("Profile is already submitted".to_string()));
    }
    tx.commit().await?;

    Ok(Json(load_view(&state.db, &student.student_guid).await?))
}

/// POST /api/profile/submit
pub async fn submit_profile(State(state): State<AppState>, student: StudentUser) -> ApiResult<Json<ProfileView>> {
    deadline::ensure_open(&state.db).await?;

    let view = load_view(&state.db, &student.student_guid).await?;
    if view.status == SubmissionStatus::Submitted {
        return Err(ApiError::Conflict(
            "Profile is already submitted".to_string(),
        ));
    }

    let missing: Vec<&str> = view
        .fields
        .iter()
        .filter(|f| f.required && f.value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|f| f.label.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Required fields missing: {}",
            missing.join(", ")
        )));
    }

    profiles::set_status(&state.db, &student.student_guid, SubmissionStatus::Submitted).await?;
    info!("Profile submitted by {}", student.user.username);

    Ok(Json(load_view(&state.db, &student.student_guid).await?))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/profile/submit", post(submit_profile))
}
