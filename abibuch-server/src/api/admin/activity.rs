//! Activity feed and dashboard counters

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::db::activity::{self, ActivityItem};
use crate::db::{comments, photos, profiles, quotes, students, teachers, votes};
use crate::deadline::{self, DeadlineState};
use crate::{ApiResult, AppState};

const DEFAULT_FEED_LIMIT: i64 = 50;
const MAX_FEED_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

fn feed_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT)
}

/// GET /api/admin/activity?limit=
pub async fn recent_activity(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<ActivityItem>>> {
    Ok(Json(activity::feed(&state.db, feed_limit(query.limit)).await?))
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub students: i64,
    pub teachers: i64,
    pub submitted_profiles: i64,
    pub submitted_rankings: i64,
    pub pending_quotes: i64,
    pub pending_comments: i64,
    pub photos: i64,
    pub deadline: DeadlineState,
}

/// GET /api/admin/stats
pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Stats>> {
    let pool = &state.db;

    Ok(Json(Stats {
        students: students::count(pool).await?,
        teachers: teachers::count(pool).await?,
        submitted_profiles: profiles::count_submitted(pool).await?,
        submitted_rankings: votes::count_submitted(pool).await?,
        pending_quotes: quotes::count_pending(pool).await?,
        pending_comments: comments::count_pending(pool).await?,
        photos: photos::count(pool).await?,
        deadline: deadline::current(pool).await?,
    }))
}

pub fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/activity", get(recent_activity))
        .route("/api/admin/stats", get(stats))
}
