//! Steckbrief field management

use abibuch_common::models::{AuditAction, ProfileField};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::{check_permutation, ReorderRequest};
use crate::api::{path_guid, required_text};
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::fields::{self, FieldInput};
use crate::{ApiError, ApiResult, AppState};

const MAX_LABEL_LENGTH: usize = 200;
const MAX_VALUE_LENGTH_LIMIT: i64 = 10_000;

fn validate(input: &FieldInput) -> ApiResult<FieldInput> {
    if !(1..=MAX_VALUE_LENGTH_LIMIT).contains(&input.max_length) {
        return Err(ApiError::BadRequest(format!(
            "max_length must be between 1 and {}",
            MAX_VALUE_LENGTH_LIMIT
        )));
    }

    Ok(FieldInput {
        label: required_text(&input.label, "label", MAX_LABEL_LENGTH)?,
        ..input.clone()
    })
}

/// GET /api/admin/fields
pub async fn list_fields(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<ProfileField>>> {
    Ok(Json(fields::list(&state.db).await?))
}

/// POST /api/admin/fields
pub async fn create_field(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(input): Json<FieldInput>,
) -> ApiResult<(StatusCode, Json<ProfileField>)> {
    let input = validate(&input)?;

    let mut tx = state.db.begin().await?;
    let field = fields::insert(&mut tx, &input).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Create,
            entity::FIELD,
            format!("Created field '{}'", field.label),
        )
        .entity(&field.guid)
        .after(&field),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(field)))
}

/// PUT /api/admin/fields/:guid
///
/// Existing values longer than a lowered `max_length` are kept as they are.
pub async fn update_field(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
    Json(input): Json<FieldInput>,
) -> ApiResult<Json<ProfileField>> {
    let guid = path_guid(&guid)?;
    let input = validate(&input)?;
    let before = fields::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Field {}", guid)))?;

    let mut tx = state.db.begin().await?;
    fields::update(&mut *tx, &guid, &input).await?;
    let after = fields::find(&mut *tx, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Field {}", guid)))?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Update,
            entity::FIELD,
            format!("Updated field '{}'", after.label),
        )
        .entity(&guid)
        .before(&before)
        .after(&after),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(after))
}

/// DELETE /api/admin/fields/:guid
pub async fn delete_field(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    let guid = path_guid(&guid)?;
    let before = fields::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Field {}", guid)))?;

    let mut tx = state.db.begin().await?;
    fields::delete(&mut tx, &guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Delete,
            entity::FIELD,
            format!("Deleted field '{}'", before.label),
        )
        .entity(&guid)
        .before(&before),
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/fields/reorder
pub async fn reorder_fields(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<ProfileField>>> {
    let mut tx = state.db.begin().await?;

    let current: Vec<String> = fields::list(&mut *tx).await?.into_iter().map(|f| f.guid).collect();
    let order = check_permutation(&current, &req.order)?;

    fields::reorder(&mut tx, &order).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Reorder,
            entity::FIELD,
            format!("Reordered {} fields", order.len()),
        )
        .before(&current)
        .after(&order),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(fields::list(&state.db).await?))
}

pub fn field_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/fields", get(list_fields).post(create_field))
        .route("/api/admin/fields/reorder", post(reorder_fields))
        .route("/api/admin/fields/:guid", put(update_field).delete(delete_field))
}
