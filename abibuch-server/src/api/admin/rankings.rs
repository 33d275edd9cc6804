//! Ranking results, submission status and reopening

use abibuch_common::models::{AuditAction, SubmissionStatus};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::api::path_guid;
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::votes::{self, RankingProgress, RankingState};
use crate::db::{self, questions, students};
use crate::ranking::{aggregate, QuestionResult};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    /// Only count votes of students who submitted their ranking
    #[serde(default)]
    pub submitted_only: bool,
    /// Keep entries ranked at most this (ties included)
    #[serde(default)]
    pub top: Option<usize>,
}

/// Tally every question, inactive ones included
pub(crate) async fn compute_results(pool: &SqlitePool, query: &ResultsQuery) -> ApiResult<Vec<QuestionResult>> {
    if query.top == Some(0) {
        return Err(ApiError::BadRequest("top must be at least 1".to_string()));
    }

    let questions = questions::list(pool, false).await?;
    let votes = votes::all(pool, query.submitted_only).await?;
    let directory = db::load_directory(pool).await?;

    debug!(
        "Aggregating {} votes over {} questions",
        votes.len(),
        questions.len()
    );
    Ok(aggregate(&questions, &votes, &directory, query.top))
}

/// GET /api/admin/rankings/results?submitted_only=&top=
pub async fn results(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<Vec<QuestionResult>>> {
    Ok(Json(compute_results(&state.db, &query).await?))
}

/// GET /api/admin/rankings/status
pub async fn submission_status(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<RankingProgress>>> {
    Ok(Json(votes::progress(&state.db).await?))
}

/// POST /api/admin/rankings/:student_guid/reopen
pub async fn reopen_ranking(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(student_guid): Path<String>,
) -> ApiResult<Json<RankingState>> {
    let student_guid = path_guid(&student_guid)?;
    let student = students::find(&state.db, &student_guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Student {}", student_guid)))?;

    let before = votes::state(&state.db, &student_guid).await?;
    if before.status != SubmissionStatus::Submitted {
        return Err(ApiError::Conflict("Ranking is not submitted".to_string()));
    }

    let mut tx = state.db.begin().await?;
    votes::set_status(&mut *tx, &student_guid, SubmissionStatus::Draft).await?;
    let after = votes::state(&mut *tx, &student_guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Update,
            entity::RANKING,
            format!("Reopened ranking of {}", student.display_name()),
        )
        .entity(&student_guid)
        .before(&before)
        .after(&after),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(after))
}

pub fn ranking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/rankings/results", get(results))
        .route("/api/admin/rankings/status", get(submission_status))
        .route("/api/admin/rankings/:student_guid/reopen", post(reopen_ranking))
}
