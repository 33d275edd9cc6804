//! Admin audit log
//!
//! Every admin mutation writes one entry in the same transaction as the
//! mutation itself. The audit view groups bursts of similar entries (same
//! alias, action and entity type, close together in time) so a bulk edit
//! session reads as one line.

use abibuch_common::models::AuditAction;
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::info;

use crate::auth::AdminActor;

/// Entity type names used in audit entries
pub mod entity {
    pub const STUDENT: &str = "student";
    pub const TEACHER: &str = "teacher";
    pub const QUESTION: &str = "question";
    pub const FIELD: &str = "field";
    pub const ACCOUNT: &str = "account";
    pub const PROFILE: &str = "profile";
    pub const RANKING: &str = "ranking";
    pub const QUOTE: &str = "quote";
    pub const COMMENT: &str = "comment";
    pub const PHOTO: &str = "photo";
    pub const DEADLINE: &str = "deadline";
}

/// One change to record
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_guid: Option<String>,
    pub summary: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, entity_type: &'static str, summary: impl Into<String>) -> Self {
        Self {
            action,
            entity_type,
            entity_guid: None,
            summary: summary.into(),
            before: None,
            after: None,
        }
    }

    pub fn entity(mut self, guid: impl Into<String>) -> Self {
        self.entity_guid = Some(guid.into());
        self
    }

    pub fn before<T: Serialize>(mut self, value: &T) -> Self {
        self.before = Some(snapshot(value));
        self
    }

    pub fn after<T: Serialize>(mut self, value: &T) -> Self {
        self.after = Some(snapshot(value));
        self
    }
}

/// JSON snapshot of a value for before/after columns
pub fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Write an audit entry attributed to `actor`
pub async fn record(conn: &mut SqliteConnection, actor: &AdminActor, event: AuditEvent) -> Result<()> {
    let before = event.before.as_ref().map(Value::to_string);
    let after = event.after.as_ref().map(Value::to_string);

    sqlx::query(
        r#"
        INSERT INTO audit_log
            (guid, created_at, admin_guid, alias, action, entity_type, entity_guid, summary, before_json, after_json)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid_utils::generate())
    .bind(to_db(now()))
    .bind(&actor.user.guid)
    .bind(&actor.alias)
    .bind(event.action)
    .bind(event.entity_type)
    .bind(&event.entity_guid)
    .bind(&event.summary)
    .bind(before)
    .bind(after)
    .execute(conn)
    .await?;

    info!(
        "[{}] {} {}: {}",
        actor.alias, event.action, event.entity_type, event.summary
    );

    Ok(())
}

/// Stored audit entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub guid: String,
    pub created_at: DateTime<Utc>,
    pub alias: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_guid: Option<String>,
    pub summary: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Burst of consecutive similar entries
#[derive(Debug, Clone, Serialize)]
pub struct AuditGroup {
    pub alias: String,
    pub action: AuditAction,
    pub entity_type: String,
    /// Oldest entry in the group
    pub started_at: DateTime<Utc>,
    /// Newest entry in the group
    pub ended_at: DateTime<Utc>,
    pub count: usize,
    pub entries: Vec<AuditEntry>,
}

impl AuditGroup {
    fn start(entry: AuditEntry) -> Self {
        Self {
            alias: entry.alias.clone(),
            action: entry.action,
            entity_type: entry.entity_type.clone(),
            started_at: entry.created_at,
            ended_at: entry.created_at,
            count: 1,
            entries: vec![entry],
        }
    }

    fn accepts(&self, entry: &AuditEntry, window: Duration) -> bool {
        // Entries arrive newest first, so the last pushed entry is the oldest.
        let gap = self.started_at - entry.created_at;
        self.alias == entry.alias
            && self.action == entry.action
            && self.entity_type == entry.entity_type
            && gap <= window
    }

    fn push(&mut self, entry: AuditEntry) {
        self.started_at = self.started_at.min(entry.created_at);
        self.ended_at = self.ended_at.max(entry.created_at);
        self.count += 1;
        self.entries.push(entry);
    }
}

/// Group entries ordered newest first
///
/// Adjacent entries join the current group while alias, action and entity
/// type match and the gap to the previous entry is at most `window`.
pub fn group_entries(entries: Vec<AuditEntry>, window: Duration) -> Vec<AuditGroup> {
    let mut groups: Vec<AuditGroup> = Vec::new();

    for entry in entries {
        match groups.last_mut() {
            Some(group) if group.accepts(&entry, window) => group.push(entry),
            _ => groups.push(AuditGroup::start(entry)),
        }
    }

    groups
}
