//! Comment endpoints for students

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{path_guid, required_text};
use crate::auth::StudentUser;
use crate::db::comments::{self, Comment};
use crate::db::{self, students};
use crate::ranking::CandidateDirectory;
use crate::{deadline, ApiError, ApiResult, AppState};

pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Comment with the author's and target's display names
#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: Option<String>,
    pub target_name: Option<String>,
}

impl CommentView {
    pub fn new(comment: Comment, directory: &CandidateDirectory) -> Self {
        use abibuch_common::models::PersonKind::Student;

        CommentView {
            author_name: directory.name(Student, &comment.author_guid).map(str::to_string),
            target_name: directory.name(Student, &comment.target_guid).map(str::to_string),
            comment,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

/// PUT /api/comments/:target_student_guid
pub async fn put_comment(
    State(state): State<AppState>,
    student: StudentUser,
    Path(target): Path<String>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<CommentView>> {
    deadline::ensure_open(&state.db).await?;

    let target = path_guid(&target)?;
    if target == student.student_guid {
        return Err(ApiError::BadRequest(
            "You cannot write a comment about yourself".to_string(),
        ));
    }
    if students::find(&state.db, &target).await?.is_none() {
        return Err(ApiError::NotFound(format!("Student {}", target)));
    }

    let text = required_text(&req.text, "text", MAX_COMMENT_LENGTH)?;
    let comment = comments::upsert(&state.db, &student.student_guid, &target, &text).await?;
    info!("Comment {} saved by {}", comment.guid, student.user.username);

    let directory = db::load_directory(&state.db).await?;
    Ok(Json(CommentView::new(comment, &directory)))
}

/// GET /api/comments/mine
pub async fn my_comments(State(state): State<AppState>, student: StudentUser) -> ApiResult<Json<Vec<CommentView>>> {
    let directory = db::load_directory(&state.db).await?;
    let comments = comments::by_author(&state.db, &student.student_guid).await?;

    Ok(Json(
        comments.into_iter().map(|c| CommentView::new(c, &directory)).collect(),
    ))
}

/// GET /api/comments/about-me
///
/// Only approved comments are visible to their subject.
pub async fn comments_about_me(
    State(state): State<AppState>,
    student: StudentUser,
) -> ApiResult<Json<Vec<CommentView>>> {
    let directory = db::load_directory(&state.db).await?;
    let comments = comments::approved_about(&state.db, &student.student_guid).await?;

    Ok(Json(
        comments.into_iter().map(|c| CommentView::new(c, &directory)).collect(),
    ))
}

/// DELETE /api/comments/:target_student_guid
pub async fn delete_comment(
    State(state): State<AppState>,
    student: StudentUser,
    Path(target): Path<String>,
) -> ApiResult<StatusCode> {
    deadline::ensure_open(&state.db).await?;

    let target = path_guid(&target)?;
    if comments::delete(&state.db, &student.student_guid, &target).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No comment about {}", target)))
    }
}

pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/comments/mine", get(my_comments))
        .route("/api/comments/about-me", get(comments_about_me))
        .route("/api/comments/:target", put(put_comment).delete(delete_comment))
}
