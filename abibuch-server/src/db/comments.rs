//! Comments students write about each other

use abibuch_common::models::ReviewStatus;
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub guid: String,
    pub author_guid: String,
    pub target_guid: String,
    pub text: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

const COMMENT_COLUMNS: &str =
    "guid, author_guid, target_guid, text, status, created_at, updated_at, reviewed_at";

/// Create or replace the author's comment about `target_guid`
///
/// Any edit sends the comment back to moderation.
pub async fn upsert<'e, E>(executor: E, author_guid: &str, target_guid: &str, text: &str) -> Result<Comment>
where
    E: Executor<'e, Database = Sqlite>,
{
    let at = to_db(now());

    let comment = sqlx::query_as::<_, Comment>(&format!(
        r#"
        INSERT INTO comments (guid, author_guid, target_guid, text, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'PENDING', ?, ?)
        ON CONFLICT(author_guid, target_guid) DO UPDATE SET
            text = excluded.text,
            status = 'PENDING',
            updated_at = excluded.updated_at,
            reviewed_at = NULL
        RETURNING {}
        "#,
        COMMENT_COLUMNS
    ))
    .bind(uuid_utils::generate())
    .bind(author_guid)
    .bind(target_guid)
    .bind(text)
    .bind(&at)
    .bind(&at)
    .fetch_one(executor)
    .await?;

    Ok(comment)
}

pub async fn find<'e, E>(executor: E, guid: &str) -> Result<Option<Comment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let comment = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {} FROM comments WHERE guid = ?",
        COMMENT_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(executor)
    .await?;

    Ok(comment)
}

pub async fn by_author(pool: &SqlitePool, author_guid: &str) -> Result<Vec<Comment>> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {} FROM comments WHERE author_guid = ? ORDER BY updated_at DESC",
        COMMENT_COLUMNS
    ))
    .bind(author_guid)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

/// Approved comments about a student
pub async fn approved_about(pool: &SqlitePool, target_guid: &str) -> Result<Vec<Comment>> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {} FROM comments WHERE target_guid = ? AND status = 'APPROVED' ORDER BY created_at",
        COMMENT_COLUMNS
    ))
    .bind(target_guid)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

pub async fn list(pool: &SqlitePool, status: Option<ReviewStatus>) -> Result<Vec<Comment>> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {} FROM comments WHERE ?1 IS NULL OR status = ?1 ORDER BY updated_at",
        COMMENT_COLUMNS
    ))
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

/// Delete the author's comment about `target_guid`
pub async fn delete<'e, E>(executor: E, author_guid: &str, target_guid: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM comments WHERE author_guid = ? AND target_guid = ?")
        .bind(author_guid)
        .bind(target_guid)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_status<'e, E>(executor: E, guid: &str, status: ReviewStatus) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE comments SET status = ?, reviewed_at = ? WHERE guid = ?")
        .bind(status)
        .bind(to_db(now()))
        .bind(guid)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_pending<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE status = 'PENDING'")
        .fetch_one(executor)
        .await?;

    Ok(count)
}
