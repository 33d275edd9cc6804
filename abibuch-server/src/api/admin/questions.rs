//! Ranking question management

use abibuch_common::models::{AuditAction, RankingQuestion};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::info;

use super::{check_permutation, ReorderRequest};
use crate::api::{path_guid, required_text};
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::questions::{self, QuestionInput};
use crate::{ApiError, ApiResult, AppState};

const MAX_TEXT_LENGTH: usize = 300;

fn validate(input: &QuestionInput) -> ApiResult<QuestionInput> {
    Ok(QuestionInput {
        text: required_text(&input.text, "text", MAX_TEXT_LENGTH)?,
        ..input.clone()
    })
}

/// GET /api/admin/questions
pub async fn list_questions(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<RankingQuestion>>> {
    Ok(Json(questions::list(&state.db, false).await?))
}

/// POST /api/admin/questions
pub async fn create_question(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(input): Json<QuestionInput>,
) -> ApiResult<(StatusCode, Json<RankingQuestion>)> {
    let input = validate(&input)?;

    let mut tx = state.db.begin().await?;
    let question = questions::insert(&mut tx, &input).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Create,
            entity::QUESTION,
            format!("Created question '{}'", question.text),
        )
        .entity(&question.guid)
        .after(&question),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// PUT /api/admin/questions/:guid
///
/// Changing the answer mode or target discards the question's votes.
pub async fn update_question(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
    Json(input): Json<QuestionInput>,
) -> ApiResult<Json<RankingQuestion>> {
    let guid = path_guid(&guid)?;
    let input = validate(&input)?;
    let before = questions::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Question {}", guid)))?;

    let mut tx = state.db.begin().await?;
    questions::update(&mut *tx, &guid, &input).await?;

    let mut summary = format!("Updated question '{}'", input.text);
    if before.answer_mode != input.answer_mode || before.target != input.target {
        let removed = questions::delete_votes(&mut *tx, &guid).await?;
        if removed > 0 {
            info!("Discarded {} votes of question {} after a mode change", removed, guid);
            summary.push_str(&format!(" ({} votes discarded)", removed));
        }
    }

    let after = questions::find(&mut *tx, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Question {}", guid)))?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(AuditAction::Update, entity::QUESTION, summary)
            .entity(&guid)
            .before(&before)
            .after(&after),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(after))
}

/// DELETE /api/admin/questions/:guid
pub async fn delete_question(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    let guid = path_guid(&guid)?;
    let before = questions::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Question {}", guid)))?;

    let mut tx = state.db.begin().await?;
    questions::delete(&mut tx, &guid).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Delete,
            entity::QUESTION,
            format!("Deleted question '{}'", before.text),
        )
        .entity(&guid)
        .before(&before),
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/questions/reorder
pub async fn reorder_questions(
    State(state): State<AppState>,
    actor: AdminActor,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<RankingQuestion>>> {
    let mut tx = state.db.begin().await?;

    let current: Vec<String> = questions::list(&mut *tx, false)
        .await?
        .into_iter()
        .map(|q| q.guid)
        .collect();
    let order = check_permutation(&current, &req.order)?;

    questions::reorder(&mut tx, &order).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Reorder,
            entity::QUESTION,
            format!("Reordered {} questions", order.len()),
        )
        .before(&current)
        .after(&order),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(questions::list(&state.db, false).await?))
}

pub fn question_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/questions", get(list_questions).post(create_question))
        .route("/api/admin/questions/reorder", post(reorder_questions))
        .route("/api/admin/questions/:guid", put(update_question).delete(delete_question))
}
