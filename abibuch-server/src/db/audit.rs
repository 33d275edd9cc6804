//! Audit log queries

use abibuch_common::models::AuditAction;
use abibuch_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};

use crate::audit::AuditEntry;

/// Optional filters of the audit view
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub alias: Option<String>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
}

#[derive(FromRow)]
struct AuditRow {
    guid: String,
    created_at: DateTime<Utc>,
    alias: String,
    action: AuditAction,
    entity_type: String,
    entity_guid: Option<String>,
    summary: String,
    before_json: Option<String>,
    after_json: Option<String>,
}

/// Stored snapshots are written by us; anything unparsable is kept as a string
fn parse_snapshot(raw: Option<String>) -> Option<Value> {
    raw.map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            guid: row.guid,
            created_at: row.created_at,
            alias: row.alias,
            action: row.action,
            entity_type: row.entity_type,
            entity_guid: row.entity_guid,
            summary: row.summary,
            before: parse_snapshot(row.before_json),
            after: parse_snapshot(row.after_json),
        }
    }
}

const FILTER_CLAUSE: &str = r#"
    WHERE (?1 IS NULL OR alias = ?1)
      AND (?2 IS NULL OR action = ?2)
      AND (?3 IS NULL OR entity_type = ?3)
"#;

pub async fn count(pool: &SqlitePool, filter: &AuditFilter) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_log {}", FILTER_CLAUSE))
        .bind(&filter.alias)
        .bind(filter.action)
        .bind(&filter.entity_type)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Entries newest first
pub async fn list(pool: &SqlitePool, filter: &AuditFilter, limit: i64, offset: i64) -> Result<Vec<AuditEntry>> {
    let rows = sqlx::query_as::<_, AuditRow>(&format!(
        r#"
        SELECT guid, created_at, alias, action, entity_type, entity_guid, summary, before_json, after_json
        FROM audit_log
        {}
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?4 OFFSET ?5
        "#,
        FILTER_CLAUSE
    ))
    .bind(&filter.alias)
    .bind(filter.action)
    .bind(&filter.entity_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AuditEntry::from).collect())
}

/// Alias with its number of entries
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AliasCount {
    pub alias: String,
    pub entries: i64,
    pub last_seen: DateTime<Utc>,
}

pub async fn aliases(pool: &SqlitePool) -> Result<Vec<AliasCount>> {
    let rows = sqlx::query_as::<_, AliasCount>(
        r#"
        SELECT alias, COUNT(*) AS entries, MAX(created_at) AS last_seen
        FROM audit_log
        GROUP BY alias
        ORDER BY alias COLLATE NOCASE
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
