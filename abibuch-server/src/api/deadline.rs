//! Submission deadline endpoints

use abibuch_common::db::{delete_setting, set_setting, SUBMISSION_DEADLINE_KEY};
use abibuch_common::models::AuditAction;
use abibuch_common::time::to_db;
use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, CurrentUser};
use crate::deadline::{self, DeadlineState};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SetDeadlineRequest {
    pub deadline: Option<DateTime<Utc>>,
}

/// GET /api/deadline
pub async fn get_deadline(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<Json<DeadlineState>> {
    Ok(Json(deadline::current(&state.db).await?))
}

/// PUT /api/admin/deadline
///
/// `null` removes the deadline.
pub async fn set_deadline(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(req): Json<SetDeadlineRequest>,
) -> ApiResult<Json<DeadlineState>> {
    let before = deadline::load(&state.db).await?;

    let mut tx = state.db.begin().await?;
    match req.deadline {
        Some(at) => set_setting(&mut *tx, SUBMISSION_DEADLINE_KEY, &to_db(at)).await?,
        None => delete_setting(&mut *tx, SUBMISSION_DEADLINE_KEY).await?,
    }

    let summary = match req.deadline {
        Some(at) => format!("Set submission deadline to {}", to_db(at)),
        None => "Removed submission deadline".to_string(),
    };
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(AuditAction::Update, entity::DEADLINE, summary)
            .before(&before)
            .after(&req.deadline),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(deadline::current(&state.db).await?))
}

pub fn deadline_routes() -> Router<AppState> {
    Router::new()
        .route("/api/deadline", get(get_deadline))
        .route("/api/admin/deadline", put(set_deadline))
}
