//! Student activity feed

use abibuch_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

/// One thing a student did
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityItem {
    /// PROFILE_SUBMITTED, RANKING_SUBMITTED, QUOTE, COMMENT or PHOTO
    pub kind: String,
    pub at: DateTime<Utc>,
    pub student_guid: String,
    pub student_name: String,
    pub detail: Option<String>,
}

/// Newest `limit` events across all submission tables
pub async fn feed(pool: &SqlitePool, limit: i64) -> Result<Vec<ActivityItem>> {
    let items = sqlx::query_as::<_, ActivityItem>(
        r#"
        SELECT f.kind, f.at, f.student_guid,
               st.first_name || ' ' || st.last_name AS student_name,
               f.detail
        FROM (
            SELECT 'PROFILE_SUBMITTED' AS kind, submitted_at AS at, student_guid, NULL AS detail
              FROM profiles WHERE status = 'SUBMITTED' AND submitted_at IS NOT NULL
            UNION ALL
            SELECT 'RANKING_SUBMITTED', submitted_at, student_guid, NULL
              FROM ranking_submissions WHERE status = 'SUBMITTED' AND submitted_at IS NOT NULL
            UNION ALL
            SELECT 'QUOTE', created_at, author_guid, text FROM quotes
            UNION ALL
            SELECT 'COMMENT', updated_at, author_guid, text FROM comments
            UNION ALL
            SELECT 'PHOTO', created_at, student_guid, category FROM photos
        ) f
        JOIN students st ON st.guid = f.student_guid
        ORDER BY f.at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(items)
}
