//! Ranking votes and ranking submissions

use abibuch_common::models::{SubmissionStatus, VoteSlot};
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

use crate::ranking::validate::VotePair;
use crate::ranking::Vote;

const VOTE_COLUMNS: &str =
    "guid, voter_guid, question_guid, slot, candidate_guid, partner_guid, created_at, updated_at";

/// Ranking submission state of one student
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RankingState {
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Per-student progress for the admin status view
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RankingProgress {
    pub student_guid: String,
    pub first_name: String,
    pub last_name: String,
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub questions_answered: i64,
}

pub async fn for_voter<'e, E>(executor: E, voter_guid: &str) -> Result<Vec<Vote>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let votes = sqlx::query_as::<_, Vote>(&format!(
        "SELECT {} FROM votes WHERE voter_guid = ? ORDER BY question_guid, slot",
        VOTE_COLUMNS
    ))
    .bind(voter_guid)
    .fetch_all(executor)
    .await?;

    Ok(votes)
}

/// All votes, optionally only those of students who submitted their ranking
pub async fn all(pool: &SqlitePool, submitted_only: bool) -> Result<Vec<Vote>> {
    let filter = if submitted_only {
        "WHERE voter_guid IN (SELECT student_guid FROM ranking_submissions WHERE status = 'SUBMITTED')"
    } else {
        ""
    };

    let votes = sqlx::query_as::<_, Vote>(&format!(
        "SELECT {} FROM votes {}",
        VOTE_COLUMNS, filter
    ))
    .fetch_all(pool)
    .await?;

    Ok(votes)
}

/// Insert or replace the vote for (voter, question, slot)
pub async fn upsert<'e, E>(
    executor: E,
    voter_guid: &str,
    question_guid: &str,
    slot: VoteSlot,
    pair: &VotePair,
) -> Result<Vote>
where
    E: Executor<'e, Database = Sqlite>,
{
    let at = to_db(now());

    let vote = sqlx::query_as::<_, Vote>(&format!(
        r#"
        INSERT INTO votes (guid, voter_guid, question_guid, slot, candidate_guid, partner_guid, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(voter_guid, question_guid, slot) DO UPDATE SET
            candidate_guid = excluded.candidate_guid,
            partner_guid = excluded.partner_guid,
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        VOTE_COLUMNS
    ))
    .bind(uuid_utils::generate())
    .bind(voter_guid)
    .bind(question_guid)
    .bind(slot)
    .bind(&pair.candidate_guid)
    .bind(&pair.partner_guid)
    .bind(&at)
    .bind(&at)
    .fetch_one(executor)
    .await?;

    Ok(vote)
}

/// Remove one vote; returns false when there was none
pub async fn delete<'e, E>(executor: E, voter_guid: &str, question_guid: &str, slot: VoteSlot) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM votes WHERE voter_guid = ? AND question_guid = ? AND slot = ?")
        .bind(voter_guid)
        .bind(question_guid)
        .bind(slot)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Ranking state, `DRAFT` when the student never submitted
pub async fn state<'e, E>(executor: E, student_guid: &str) -> Result<RankingState>
where
    E: Executor<'e, Database = Sqlite>,
{
    let state = sqlx::query_as::<_, RankingState>(
        "SELECT status, submitted_at FROM ranking_submissions WHERE student_guid = ?",
    )
    .bind(student_guid)
    .fetch_optional(executor)
    .await?;

    Ok(state.unwrap_or(RankingState {
        status: SubmissionStatus::Draft,
        submitted_at: None,
    }))
}

pub async fn set_status<'e, E>(executor: E, student_guid: &str, status: SubmissionStatus) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let at = to_db(now());
    let submitted_at = (status == SubmissionStatus::Submitted).then(|| at.clone());

    sqlx::query(
        r#"
        INSERT INTO ranking_submissions (student_guid, status, submitted_at, updated_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(student_guid) DO UPDATE SET
            status = excluded.status,
            submitted_at = excluded.submitted_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(student_guid)
    .bind(status)
    .bind(submitted_at)
    .bind(&at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Every student with submission status and number of questions answered
pub async fn progress(pool: &SqlitePool) -> Result<Vec<RankingProgress>> {
    let rows = sqlx::query_as::<_, RankingProgress>(
        r#"
        SELECT s.guid AS student_guid, s.first_name, s.last_name,
               COALESCE(r.status, 'DRAFT') AS status,
               r.submitted_at,
               (SELECT COUNT(DISTINCT v.question_guid) FROM votes v
                 WHERE v.voter_guid = s.guid) AS questions_answered
        FROM students s
        LEFT JOIN ranking_submissions r ON r.student_guid = s.guid
        ORDER BY s.last_name COLLATE NOCASE, s.first_name COLLATE NOCASE
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_submitted<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM ranking_submissions WHERE status = 'SUBMITTED'")
            .fetch_one(executor)
            .await?;

    Ok(count)
}
