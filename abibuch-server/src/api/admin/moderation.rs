//! Quote and comment moderation

use abibuch_common::models::{AuditAction, ReviewStatus};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::comments::CommentView;
use crate::api::path_guid;
use crate::api::quotes::QuoteView;
use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::{self, comments, quotes};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: ReviewStatus,
}

/// Only final decisions can be recorded
fn check_decision(status: ReviewStatus) -> ApiResult<ReviewStatus> {
    match status {
        ReviewStatus::Approved | ReviewStatus::Rejected => Ok(status),
        ReviewStatus::Pending => Err(ApiError::BadRequest(
            "Review status must be APPROVED or REJECTED".to_string(),
        )),
    }
}

/// GET /api/admin/quotes?status=
pub async fn list_quotes(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Vec<QuoteView>>> {
    let directory = db::load_directory(&state.db).await?;
    let quotes = quotes::list(&state.db, query.status).await?;

    Ok(Json(
        quotes.into_iter().map(|q| QuoteView::new(q, &directory)).collect(),
    ))
}

/// POST /api/admin/quotes/:guid/review
pub async fn review_quote(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<QuoteView>> {
    let guid = path_guid(&guid)?;
    let status = check_decision(req.status)?;
    let before = quotes::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Quote {}", guid)))?;

    let mut tx = state.db.begin().await?;
    quotes::set_status(&mut *tx, &guid, status).await?;
    let after = quotes::find(&mut *tx, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Quote {}", guid)))?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Update,
            entity::QUOTE,
            format!("Marked quote {} as {}", guid, status),
        )
        .entity(&guid)
        .before(&before)
        .after(&after),
    )
    .await?;
    tx.commit().await?;

    let directory = db::load_directory(&state.db).await?;
    Ok(Json(QuoteView::new(after, &directory)))
}

/// GET /api/admin/comments?status=
pub async fn list_comments(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let directory = db::load_directory(&state.db).await?;
    let comments = comments::list(&state.db, query.status).await?;

    Ok(Json(
        comments.into_iter().map(|c| CommentView::new(c, &directory)).collect(),
    ))
}

/// POST /api/admin/comments/:guid/review
pub async fn review_comment(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(guid): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<CommentView>> {
    let guid = path_guid(&guid)?;
    let status = check_decision(req.status)?;
    let before = comments::find(&state.db, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Comment {}", guid)))?;

    let mut tx = state.db.begin().await?;
    comments::set_status(&mut *tx, &guid, status).await?;
    let after = comments::find(&mut *tx, &guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Comment {}", guid)))?;
    audit::record(
        &mut tx,
        &actor,
        AuditEvent::new(
            AuditAction::Update,
            entity::COMMENT,
            format!("Marked comment {} as {}", guid, status),
        )
        .entity(&guid)
        .before(&before)
        .after(&after),
    )
    .await?;
    tx.commit().await?;

    let directory = db::load_directory(&state.db).await?;
    Ok(Json(CommentView::new(after, &directory)))
}

pub fn moderation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/quotes", get(list_quotes))
        .route("/api/admin/quotes/:guid/review", post(review_quote))
        .route("/api/admin/comments", get(list_comments))
        .route("/api/admin/comments/:guid/review", post(review_comment))
}
