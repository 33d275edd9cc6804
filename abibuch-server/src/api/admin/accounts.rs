//! Account management

use abibuch_common::models::{AuditAction, Role};
use abibuch_common::password::MIN_PASSWORD_LENGTH;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::api::{path_guid, required_text};
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::accounts::{self, Account};
use crate::db::students;
use crate::{ApiError, ApiResult, AppState};

const MAX_USERNAME_LENGTH: usize = 64;

/// Trimmed username without inner whitespace
pub fn validate_username(raw: &str) -> ApiResult<String> {
    let username = required_text(raw, "username", MAX_USERNAME_LENGTH)?;
    if username.chars().any(char::is_whitespace) {
        return Err(ApiError::BadRequest(
            "username must not contain spaces".to_string(),
        ));
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub student_guid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

/// GET /api/admin/accounts
pub async fn list_accounts(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(accounts::list(&state.db).await?))
}

/// POST /api/admin/accounts
///
/// Student accounts link to exactly one student; admin accounts to none.
pub async fn create_account(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let username = validate_username(&req.username)?;
    validate_password(&req.password)?;

    let student_guid = match (req.role, req.student_guid.as_deref()) {
        (Role::Student, Some(raw)) => {
            let guid = abibuch_common::uuid_utils::normalize(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown student '{}'", raw)))?;
            if students::find(&state.db, &guid).await?.is_none() {
                return Err(ApiError::BadRequest(format!("Unknown student '{}'", guid)));
            }
            if accounts::find_by_student(&state.db, &guid).await?.is_some() {
                return Err(ApiError::Conflict(
                    "This student already has an account".to_string(),
                ));
            }
            Some(guid)
        }
        (Role::Student, None) => {
            return Err(ApiError::BadRequest(
                "Student accounts need a student_guid".to_string(),
            ))
        }
        (Role::Admin, Some(_)) => {
            return Err(ApiError::BadRequest(
                "Admin accounts cannot be linked to a student".to_string(),
            ))
        }
        (Role::Admin, None) => None,
    };

    if accounts::find_by_username(&state.db, &username).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Username '{}' is already taken",
            username
        )));
    }

    let mut tx = state.db.begin().await?;
    let account =
        accounts::insert(&mut *tx, &username, &req.password, req.role, student_guid.as_deref()).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Create,
            entity::ACCOUNT,
            format!("Created {} account {}", account.role, account.username),
        )
        .entity(&account.guid)
        .after(&account),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// DELETE /api/admin/accounts/:guid
///
/// The last admin and the caller's own account cannot be deleted.
pub async fn delete_account(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    let guid = path_guid(&guid)?;
    let account = accounts::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Account {}", guid)))?;

    if account.guid == actor.user.guid {
        return Err(ApiError::Conflict(
            "You cannot delete your own account".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    if account.role == Role::Admin && accounts::count_admins(&mut *tx).await? <= 1 {
        return Err(ApiError::Conflict(
            "The last admin account cannot be deleted".to_string(),
        ));
    }

    accounts::delete(&mut *tx, &guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Delete,
            entity::ACCOUNT,
            format!("Deleted account {}", account.username),
        )
        .entity(&guid)
        .before(&account),
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/accounts/:guid/password
///
/// Ends every session of the account.
pub async fn reset_password(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
    Json(req): Json<SetPasswordRequest>,
) -> ApiResult<StatusCode> {
    let guid = path_guid(&guid)?;
    validate_password(&req.password)?;
    let account = accounts::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Account {}", guid)))?;

    let mut tx = state.db.begin().await?;
    accounts::set_password(&mut *tx, &guid, &req.password).await?;
    let ended = accounts::delete_sessions_for(&mut *tx, &guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Update,
            entity::ACCOUNT,
            format!("Reset password of {}", account.username),
        )
        .entity(&guid),
    )
    .await?;
    tx.commit().await?;

    info!("Ended {} sessions of {}", ended, account.username);
    Ok(StatusCode::NO_CONTENT)
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/accounts", get(list_accounts).post(create_account))
        .route("/api/admin/accounts/:guid", delete(delete_account))
        .route("/api/admin/accounts/:guid/password", post(reset_password))
}
