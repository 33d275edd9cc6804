//! Quote endpoints for students

use abibuch_common::models::{PersonKind, ReviewStatus};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{optional_text, path_guid, required_text};
use crate::auth::StudentUser;
use crate::db::quotes::{self, NewQuote, Quote};
use crate::db::{self, students, teachers};
use crate::ranking::CandidateDirectory;
use crate::{deadline, ApiError, ApiResult, AppState};

pub const MAX_QUOTE_LENGTH: usize = 500;
const MAX_CONTEXT_LENGTH: usize = 200;

/// Quote with the speaker's display name
#[derive(Debug, Serialize)]
pub struct QuoteView {
    #[serde(flatten)]
    pub quote: Quote,
    pub speaker_name: Option<String>,
}

impl QuoteView {
    pub fn new(quote: Quote, directory: &CandidateDirectory) -> Self {
        let speaker_name = directory
            .name(quote.speaker_kind, &quote.speaker_guid)
            .map(str::to_string);
        QuoteView { quote, speaker_name }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewQuoteRequest {
    pub speaker_kind: PersonKind,
    pub speaker_guid: String,
    pub text: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// POST /api/quotes
pub async fn create_quote(
    State(state): State<AppState>,
    student: StudentUser,
    Json(req): Json<NewQuoteRequest>,
) -> ApiResult<(StatusCode, Json<QuoteView>)> {
    deadline::ensure_open(&state.db).await?;

    let text = required_text(&req.text, "text", MAX_QUOTE_LENGTH)?;
    let context = optional_text(req.context.as_deref(), "context", MAX_CONTEXT_LENGTH)?;

    let speaker_guid = abibuch_common::uuid_utils::normalize(&req.speaker_guid)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown speaker '{}'", req.speaker_guid)))?;
    let speaker_name = match req.speaker_kind {
        PersonKind::Student => students::find(&state.db, &speaker_guid).await?.map(|s| s.display_name()),
        PersonKind::Teacher => teachers::find(&state.db, &speaker_guid).await?.map(|t| t.display_name()),
    }
    .ok_or_else(|| ApiError::BadRequest(format!("Unknown speaker '{}'", speaker_guid)))?;

    let quote = quotes::insert(
        &state.db,
        NewQuote {
            author_guid: &student.student_guid,
            speaker_kind: req.speaker_kind,
            speaker_guid: &speaker_guid,
            text: &text,
            context: context.as_deref(),
        },
    )
    .await?;
    info!("Quote {} submitted by {}", quote.guid, student.user.username);

    Ok((
        StatusCode::CREATED,
        Json(QuoteView {
            quote,
            speaker_name: Some(speaker_name),
        }),
    ))
}

/// GET /api/quotes/mine
pub async fn my_quotes(State(state): State<AppState>, student: StudentUser) -> ApiResult<Json<Vec<QuoteView>>> {
    let directory = db::load_directory(&state.db).await?;
    let quotes = quotes::by_author(&state.db, &student.student_guid).await?;

    Ok(Json(
        quotes.into_iter().map(|q| QuoteView::new(q, &directory)).collect(),
    ))
}

/// DELETE /api/quotes/:guid
///
/// Approved quotes are final for the student; an admin can still reject them.
pub async fn delete_quote(
    State(state): State<AppState>,
    student: StudentUser,
    Path(guid): Path<String>,
) -> ApiResult<StatusCode> {
    deadline::ensure_open(&state.db).await?;

    let guid = path_guid(&guid)?;
    let quote = quotes::find(&state.db, &guid)
        .await?
        .filter(|q| q.author_guid == student.student_guid)
        .ok_or_else(|| ApiError::NotFound(format!("Quote {}", guid)))?;

    if quote.status == ReviewStatus::Approved {
        return Err(ApiError::Conflict(
            "Approved quotes cannot be deleted".to_string(),
        ));
    }

    quotes::delete(&state.db, &quote.guid).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/api/quotes", post(create_quote))
        .route("/api/quotes/mine", get(my_quotes))
        .route("/api/quotes/:guid", delete(delete_quote))
}
