//! Teacher and student quotes

use abibuch_common::models::{PersonKind, ReviewStatus};
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Quote {
    pub guid: String,
    pub author_guid: String,
    pub speaker_kind: PersonKind,
    pub speaker_guid: String,
    pub text: String,
    pub context: Option<String>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Fields of a new quote
#[derive(Debug, Clone)]
pub struct NewQuote<'a> {
    pub author_guid: &'a str,
    pub speaker_kind: PersonKind,
    pub speaker_guid: &'a str,
    pub text: &'a str,
    pub context: Option<&'a str>,
}

const QUOTE_COLUMNS: &str =
    "guid, author_guid, speaker_kind, speaker_guid, text, context, status, created_at, reviewed_at";

pub async fn insert<'e, E>(executor: E, new: NewQuote<'_>) -> Result<Quote>
where
    E: Executor<'e, Database = Sqlite>,
{
    let quote = Quote {
        guid: uuid_utils::generate(),
        author_guid: new.author_guid.to_string(),
        speaker_kind: new.speaker_kind,
        speaker_guid: new.speaker_guid.to_string(),
        text: new.text.to_string(),
        context: new.context.map(str::to_string),
        status: ReviewStatus::Pending,
        created_at: now(),
        reviewed_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO quotes (guid, author_guid, speaker_kind, speaker_guid, text, context, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&quote.guid)
    .bind(&quote.author_guid)
    .bind(quote.speaker_kind)
    .bind(&quote.speaker_guid)
    .bind(&quote.text)
    .bind(&quote.context)
    .bind(quote.status)
    .bind(to_db(quote.created_at))
    .execute(executor)
    .await?;

    Ok(quote)
}

pub async fn find<'e, E>(executor: E, guid: &str) -> Result<Option<Quote>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let quote = sqlx::query_as::<_, Quote>(&format!(
        "SELECT {} FROM quotes WHERE guid = ?",
        QUOTE_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(executor)
    .await?;

    Ok(quote)
}

/// Quotes submitted by one student, newest first
pub async fn by_author(pool: &SqlitePool, author_guid: &str) -> Result<Vec<Quote>> {
    let quotes = sqlx::query_as::<_, Quote>(&format!(
        "SELECT {} FROM quotes WHERE author_guid = ? ORDER BY created_at DESC",
        QUOTE_COLUMNS
    ))
    .bind(author_guid)
    .fetch_all(pool)
    .await?;

    Ok(quotes)
}

/// Moderation queue, oldest first
pub async fn list(pool: &SqlitePool, status: Option<ReviewStatus>) -> Result<Vec<Quote>> {
    let quotes = sqlx::query_as::<_, Quote>(&format!(
        "SELECT {} FROM quotes WHERE ?1 IS NULL OR status = ?1 ORDER BY created_at",
        QUOTE_COLUMNS
    ))
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(quotes)
}

pub async fn delete<'e, E>(executor: E, guid: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM quotes WHERE guid = ?")
        .bind(guid)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_status<'e, E>(executor: E, guid: &str, status: ReviewStatus) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE quotes SET status = ?, reviewed_at = ? WHERE guid = ?")
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
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotes WHERE status = 'PENDING'")
        .fetch_one(executor)
        .await?;

    Ok(count)
}
