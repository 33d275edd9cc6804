//! Teacher management

use abibuch_common::models::{AuditAction, Teacher};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::api::{optional_text, path_guid, required_text};
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::teachers::{self, TeacherInput};
use crate::{ApiError, ApiResult, AppState};

const MAX_NAME_LENGTH: usize = 100;

pub(crate) fn validate(input: &TeacherInput) -> ApiResult<TeacherInput> {
    Ok(TeacherInput {
        first_name: optional_text(input.first_name.as_deref(), "first_name", MAX_NAME_LENGTH)?,
        last_name: required_text(&input.last_name, "last_name", MAX_NAME_LENGTH)?,
        gender: input.gender,
        subject: optional_text(input.subject.as_deref(), "subject", MAX_NAME_LENGTH)?,
    })
}

async fn find_or_404(state: &AppState, guid: &str) -> ApiResult<Teacher> {
    teachers::find(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Teacher {}", guid)))
}

/// GET /api/admin/teachers
pub async fn list_teachers(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<Teacher>>> {
    Ok(Json(teachers::list(&state.db).await?))
}

/// POST /api/admin/teachers
pub async fn create_teacher(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(input): Json<TeacherInput>,
) -> ApiResult<(StatusCode, Json<Teacher>)> {
    let input = validate(&input)?;

    let mut tx = state.db.begin().await?;
    let teacher = teachers::insert(&mut *tx, &input).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Create,
            entity::TEACHER,
            format!("Created teacher {}", teacher.display_name()),
        )
        .entity(&teacher.guid)
        .after(&teacher),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(teacher)))
}

/// PUT /api/admin/teachers/:guid
pub async fn update_teacher(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
    Json(input): Json<TeacherInput>,
) -> ApiResult<Json<Teacher>> {
    let guid = path_guid(&guid)?;
    let input = validate(&input)?;
    let before = find_or_404(&state, &guid).await?;

    let mut tx = state.db.begin().await?;
    teachers::update(&mut *tx, &guid, &input).await?;
    let after = teachers::find(&mut *tx, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Teacher {}", guid)))?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Update,
            entity::TEACHER,
            format!("Updated teacher {}", after.display_name()),
        )
        .entity(&guid)
        .before(&before)
        .after(&after),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(after))
}

/// DELETE /api/admin/teachers/:guid
pub async fn delete_teacher(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    let guid = path_guid(&guid)?;
    let before = find_or_404(&state, &guid).await?;

    let mut tx = state.db.begin().await?;
    teachers::delete(&mut tx, &guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Delete,
            entity::TEACHER,
            format!("Deleted teacher {}", before.display_name()),
        )
        .entity(&guid)
        .before(&before),
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn teacher_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/teachers", get(list_teachers).post(create_teacher))
        .route("/api/admin/teachers/:guid", put(update_teacher).delete(delete_teacher))
}
