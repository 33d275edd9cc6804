//! Ranking (voting) endpoints for students

use std::collections::HashMap;

use abibuch_common::models::{AnswerMode, Gender, PersonKind, SubmissionStatus, VoteSlot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::path_guid;
use crate::auth::StudentUser;
use crate::db::{self, questions, students, teachers, votes};
use crate::ranking::{check_gender, check_shape, VoteError};
use crate::{deadline, ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct VoteView {
    pub candidate_guid: String,
    pub candidate_name: Option<String>,
    pub partner_guid: Option<String>,
    pub partner_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SlotView {
    pub slot: VoteSlot,
    pub vote: Option<VoteView>,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub guid: String,
    pub text: String,
    pub target: PersonKind,
    pub answer_mode: AnswerMode,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Serialize)]
pub struct RankingView {
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionView>,
}

async fn load_view(pool: &SqlitePool, student_guid: &str) -> ApiResult<RankingView> {
    let state = votes::state(pool, student_guid).await?;
    let directory = db::load_directory(pool).await?;

    let mut mine: HashMap<(String, VoteSlot), crate::ranking::Vote> = votes::for_voter(pool, student_guid)
        .await?
        .into_iter()
        .map(|v| ((v.question_guid.clone(), v.slot), v))
        .collect();

    let questions = questions::list(pool, true)
        .await?
        .into_iter()
        .map(|q| {
            let slots = q
                .answer_mode
                .slots()
                .iter()
                .map(|&slot| SlotView {
                    slot,
                    vote: mine.remove(&(q.guid.clone(), slot)).map(|v| VoteView {
                        candidate_name: directory.name(q.target, &v.candidate_guid).map(str::to_string),
                        partner_name: v
                            .partner_guid
                            .as_deref()
                            .and_then(|p| directory.name(q.target, p))
                            .map(str::to_string),
                        candidate_guid: v.candidate_guid,
                        partner_guid: v.partner_guid,
                        updated_at: v.updated_at,
                    }),
                })
                .collect();

            QuestionView {
                guid: q.guid,
                text: q.text,
                target: q.target,
                answer_mode: q.answer_mode,
                slots,
            }
        })
        .collect();

    Ok(RankingView {
        status: state.status,
        submitted_at: state.submitted_at,
        questions,
    })
}

/// Refuse ranking edits after the deadline or once submitted
async fn ensure_editable(pool: &SqlitePool, student_guid: &str) -> ApiResult<()> {
    deadline::ensure_open(pool).await?;

    if votes::state(pool, student_guid).await?.status == SubmissionStatus::Submitted {
        return Err(ApiError::Conflict("Ranking is already submitted".to_string()));
    }
    Ok(())
}

/// Check the submission state again after a vote write in `conn`'s transaction
///
/// The write takes the database write lock first, so a concurrent submit
/// either finished before it or waits for the commit.
async fn ensure_still_draft(conn: &mut SqliteConnection, student_guid: &str) -> ApiResult<()> {
    if votes::state(&mut *conn, student_guid).await?.status == SubmissionStatus::Submitted {
        return Err(ApiError::Conflict("Ranking is already submitted".to_string()));
    }
    Ok(())
}

/// Gender of an existing candidate of the given kind
async fn candidate_gender(pool: &SqlitePool, kind: PersonKind, guid: &str) -> ApiResult<Gender> {
    let gender = match kind {
        PersonKind::Student => students::find(pool, guid).await?.map(|s| s.gender),
        PersonKind::Teacher => teachers::find(pool, guid).await?.map(|t| t.gender),
    };

    gender.ok_or_else(|| VoteError::UnknownCandidate(guid.to_string()).into())
}

/// GET /api/ranking
pub async fn get_ranking(State(state): State<AppState>, student: StudentUser) -> ApiResult<Json<RankingView>> {
    Ok(Json(load_view(&state.db, &student.student_guid).await?))
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub slot: VoteSlot,
    pub candidate_guid: String,
    #[serde(default)]
    pub partner_guid: Option<String>,
}

/// PUT /api/ranking/:question_guid/votes
pub async fn cast_vote(
    State(state): State<AppState>,
    student: StudentUser,
    Path(question_guid): Path<String>,
    Json(req): Json<CastVoteRequest>,
) -> ApiResult<Json<crate::ranking::Vote>> {
    ensure_editable(&state.db, &student.student_guid).await?;

    let question_guid = path_guid(&question_guid)?;
    let question = questions::find(&state.db, &question_guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Question {}", question_guid)))?;

    // Unparseable guids cannot name a candidate
    let candidate = abibuch_common::uuid_utils::normalize(&req.candidate_guid)
        .ok_or_else(|| VoteError::UnknownCandidate(req.candidate_guid.clone()))?;
    let partner = match req.partner_guid.as_deref() {
        Some(raw) => Some(
            abibuch_common::uuid_utils::normalize(raw)
                .ok_or_else(|| VoteError::UnknownCandidate(raw.to_string()))?,
        ),
        None => None,
    };

    let pair = check_shape(
        &question,
        &student.student_guid,
        req.slot,
        &candidate,
        partner.as_deref(),
    )?;

    for guid in pair.guids() {
        let gender = candidate_gender(&state.db, question.target, guid).await?;
        if question.answer_mode == AnswerMode::GenderSpecific {
            check_gender(req.slot, gender)?;
        }
    }

    let mut tx = state.db.begin().await?;
    let vote = votes::upsert(&mut *tx, &student.student_guid, &question.guid, req.slot, &pair).await?;
    ensure_still_draft(&mut tx, &student.student_guid).await?;
    tx.commit().await?;
    debug!(
        "Vote by {} on question {} slot {}",
        student.user.username, question.guid, req.slot
    );

    Ok(Json(vote))
}

/// DELETE /api/ranking/:question_guid/votes/:slot
pub async fn clear_vote(
    State(state): State<AppState>,
    student: StudentUser,
    Path((question_guid, slot)): Path<(String, VoteSlot)>,
) -> ApiResult<StatusCode> {
    ensure_editable(&state.db, &student.student_guid).await?;

    let question_guid = path_guid(&question_guid)?;
    let mut tx = state.db.begin().await?;
    if !votes::delete(&mut *tx, &student.student_guid, &question_guid, slot).await? {
        return Err(ApiError::NotFound("No vote in this slot".to_string()));
    }
    ensure_still_draft(&mut tx, &student.student_guid).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/ranking/submit
///
/// Questions may be left unanswered; submitting only locks further edits.
pub async fn submit_ranking(State(state): State<AppState>, student: StudentUser) -> ApiResult<Json<RankingView>> {
    ensure_editable(&state.db, &student.student_guid).await?;

    votes::set_status(&state.db, &student.student_guid, SubmissionStatus::Submitted).await?;
    info!("Ranking submitted by {}", student.user.username);

    Ok(Json(load_view(&state.db, &student.student_guid).await?))
}

pub fn ranking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ranking", get(get_ranking))
        .route("/api/ranking/submit", post(submit_ranking))
        .route("/api/ranking/:question_guid/votes", put(cast_vote))
        .route("/api/ranking/:question_guid/votes/:slot", delete(clear_vote))
}
