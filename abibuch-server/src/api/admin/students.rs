//! Student management

use abibuch_common::models::{AuditAction, Student};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::api::photos::remove_files;
use crate::api::{optional_text, path_guid, required_text};
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::students::{self, StudentInput};
use crate::db::photos;
use crate::{ApiError, ApiResult, AppState};

const MAX_NAME_LENGTH: usize = 100;

/// Trimmed copy of `input`, or 400
pub(crate) fn validate(input: &StudentInput) -> ApiResult<StudentInput> {
    let email = optional_text(input.email.as_deref(), "email", MAX_NAME_LENGTH)?;
    if let Some(email) = &email {
        if !email.contains('@') {
            return Err(ApiError::BadRequest(format!("Invalid email '{}'", email)));
        }
    }

    Ok(StudentInput {
        first_name: required_text(&input.first_name, "first_name", MAX_NAME_LENGTH)?,
        last_name: required_text(&input.last_name, "last_name", MAX_NAME_LENGTH)?,
        gender: input.gender,
        email,
    })
}

async fn find_or_404(state: &AppState, guid: &str) -> ApiResult<Student> {
    students::find(&state.db, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Student {}", guid)))
}

/// GET /api/admin/students
pub async fn list_students(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<Student>>> {
    Ok(Json(students::list(&state.db).await?))
}

/// POST /api/admin/students
pub async fn create_student(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(input): Json<StudentInput>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let input = validate(&input)?;

    let mut tx = state.db.begin().await?;
    let student = students::insert(&mut *tx, &input).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Create,
            entity::STUDENT,
            format!("Created student {}", student.display_name()),
        )
        .entity(&student.guid)
        .after(&student),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/admin/students/:guid
pub async fn update_student(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
    Json(input): Json<StudentInput>,
) -> ApiResult<Json<Student>> {
    let guid = path_guid(&guid)?;
    let input = validate(&input)?;
    let before = find_or_404(&state, &guid).await?;

    let mut tx = state.db.begin().await?;
    students::update(&mut *tx, &guid, &input).await?;
    let after = students::find(&mut *tx, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Student {}", guid)))?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Update,
            entity::STUDENT,
            format!("Updated student {}", after.display_name()),
        )
        .entity(&guid)
        .before(&before)
        .after(&after),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(after))
}

/// DELETE /api/admin/students/:guid
///
/// Removes the student's profile, votes, submissions, quotes, comments,
/// photos and linked account.
pub async fn delete_student(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    let guid = path_guid(&guid)?;
    let before = find_or_404(&state, &guid).await?;

    let mut tx = state.db.begin().await?;
    let files = photos::file_names_for(&mut *tx, &guid).await?;
    students::delete(&mut tx, &guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Delete,
            entity::STUDENT,
            format!("Deleted student {}", before.display_name()),
        )
        .entity(&guid)
        .before(&before),
    )
    .await?;
    tx.commit().await?;

    remove_files(&state.uploads_dir, &files).await;
    Ok(StatusCode::NO_CONTENT)
}

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/students", get(list_students).post(create_student))
        .route("/api/admin/students/:guid", put(update_student).delete(delete_student))
}
