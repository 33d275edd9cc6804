//! Submission deadline
//!
//! A single global cutoff stored in the settings table. Once it passes,
//! every student write is rejected with 423; admin operations ignore it.

use abibuch_common::db::{get_setting, SUBMISSION_DEADLINE_KEY};
use abibuch_common::time::{from_db, now};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{ApiError, ApiResult};

/// Deadline as reported to clients
#[derive(Debug, Clone, Serialize)]
pub struct DeadlineState {
    pub deadline: Option<DateTime<Utc>>,
    pub open: bool,
}

/// Submissions are open without a deadline or strictly before it
pub fn is_open(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match deadline {
        None => true,
        Some(deadline) => now < deadline,
    }
}

/// Load the configured deadline
pub async fn load(pool: &SqlitePool) -> abibuch_common::Result<Option<DateTime<Utc>>> {
    get_setting(pool, SUBMISSION_DEADLINE_KEY)
        .await?
        .as_deref()
        .map(from_db)
        .transpose()
}

/// Current deadline and whether submissions are still open
pub async fn current(pool: &SqlitePool) -> abibuch_common::Result<DeadlineState> {
    let deadline = load(pool).await?;
    Ok(DeadlineState {
        deadline,
        open: is_open(deadline, now()),
    })
}

/// Fail with `DeadlinePassed` once the deadline is reached
pub async fn ensure_open(pool: &SqlitePool) -> ApiResult<()> {
    if current(pool).await?.open {
        Ok(())
    } else {
        Err(ApiError::DeadlinePassed)
    }
}
