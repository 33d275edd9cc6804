//! CSV import preview and commit

use std::collections::{BTreeMap, HashMap, HashSet};

use abibuch_common::models::{AuditAction, Gender};
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use crate::audit::{self, entity, AuditEvent};
use crate::auth::{AdminActor, AdminUser};
use crate::db::students::{self, StudentInput};
use crate::db::teachers::{self, TeacherInput};
use crate::import::{
    duplicate_key, map_rows, match_headers, parse_csv, validate_values, HeaderMatch, ImportKind, ImportRow,
};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub csv: String,
    /// Field name to header text, overriding auto-matching
    #[serde(default)]
    pub mapping: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub kind: &'static str,
    pub delimiter: String,
    pub headers: Vec<String>,
    #[serde(flatten)]
    pub matched: HeaderMatch,
    pub rows: Vec<ImportRow>,
    pub valid_count: usize,
    pub error_count: usize,
}

/// POST /api/admin/import/:kind/preview
///
/// Writes nothing. Missing required columns still yield a preview in which
/// every row carries an error.
pub async fn preview(
    _admin: AdminUser,
    Path(kind): Path<String>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<Json<PreviewResponse>> {
    let kind = ImportKind::from_path(&kind)?;
    let parsed = parse_csv(&req.csv)?;
    let matched = match_headers(kind, &parsed.headers, &req.mapping)?;
    let rows = map_rows(kind, &parsed, &matched);

    let valid_count = rows.iter().filter(|r| r.is_valid()).count();
    Ok(Json(PreviewResponse {
        kind: kind.as_str(),
        delimiter: char::from(parsed.delimiter).to_string(),
        error_count: rows.len() - valid_count,
        headers: parsed.headers,
        matched,
        rows,
        valid_count,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub rows: Vec<ImportRow>,
    #[serde(default)]
    pub skip_duplicates: bool,
}

#[derive(Debug, Serialize)]
pub struct RowErrors {
    pub line: usize,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub imported: usize,
    /// Duplicates dropped because `skip_duplicates` was set
    pub skipped: usize,
    pub errors: Vec<RowErrors>,
}

/// Trimmed value of a field, `None` when blank
fn value(values: &BTreeMap<String, String>, field: &str) -> Option<String> {
    values
        .get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// One imported person, kept for the audit snapshot
#[derive(Debug, Serialize)]
struct Imported {
    guid: String,
    name: String,
}

async fn existing_keys(conn: &mut SqliteConnection, kind: ImportKind) -> ApiResult<HashSet<String>> {
    let keys: HashSet<String> = match kind {
        ImportKind::Students => sqlx::query_as::<_, (String, String)>("SELECT first_name, last_name FROM students")
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(|(first, last)| duplicate_key(Some(&first), &last))
            .collect(),
        ImportKind::Teachers => {
            sqlx::query_as::<_, (Option<String>, String)>("SELECT first_name, last_name FROM teachers")
                .fetch_all(&mut *conn)
                .await?
                .into_iter()
                .map(|(first, last)| duplicate_key(first.as_deref(), &last))
                .collect()
        }
    };

    Ok(keys)
}

/// Insert one validated row
async fn insert_row(conn: &mut SqliteConnection, kind: ImportKind, values: &BTreeMap<String, String>) -> ApiResult<Imported> {
    let gender = value(values, "gender")
        .and_then(|g| Gender::from_input(&g))
        .ok_or_else(|| ApiError::Internal("validated row without gender".to_string()))?;
    let last_name = value(values, "last_name").unwrap_or_default();

    let imported = match kind {
        ImportKind::Students => {
            let input = StudentInput {
                first_name: value(values, "first_name").unwrap_or_default(),
                last_name,
                gender,
                email: value(values, "email"),
            };
            let student = students::insert(&mut *conn, &input).await?;
            Imported {
                name: student.display_name(),
                guid: student.guid,
            }
        }
        ImportKind::Teachers => {
            let input = TeacherInput {
                first_name: value(values, "first_name"),
                last_name,
                gender,
                subject: value(values, "subject"),
            };
            let teacher = teachers::insert(&mut *conn, &input).await?;
            Imported {
                name: teacher.display_name(),
                guid: teacher.guid,
            }
        }
    };

    Ok(imported)
}

/// POST /api/admin/import/:kind/commit
///
/// Rows are revalidated because the client may have edited them. Invalid
/// rows are reported and skipped; they never abort the batch.
pub async fn commit(
    State(state): State<AppState>,
    actor: AdminActor,
    Path(kind): Path<String>,
    Json(req): Json<CommitRequest>,
) -> ApiResult<Json<CommitResponse>> {
    let kind = ImportKind::from_path(&kind)?;

    let mut tx = state.db.begin().await?;
    let mut seen = existing_keys(&mut tx, kind).await?;

    let mut imported: Vec<Imported> = Vec::new();
    let mut skipped = 0;
    let mut errors: Vec<RowErrors> = Vec::new();

    for row in &req.rows {
        let messages = validate_values(kind, &row.values);
        if !messages.is_empty() {
            errors.push(RowErrors {
                line: row.line,
                messages,
            });
            continue;
        }

        let first = value(&row.values, "first_name");
        let last = value(&row.values, "last_name").unwrap_or_default();
        if !seen.insert(duplicate_key(first.as_deref(), &last)) {
            if req.skip_duplicates {
                skipped += 1;
            } else {
                let name = match &first {
                    Some(first) => format!("{} {}", first, last),
                    None => last,
                };
                errors.push(RowErrors {
                    line: row.line,
                    messages: vec![format!("Duplicate: {} already exists", name)],
                });
            }
            continue;
        }

        imported.push(insert_row(&mut tx, kind, &row.values).await?);
    }

    if !imported.is_empty() {
        let entity_type = match kind {
            ImportKind::Students => entity::STUDENT,
            ImportKind::Teachers => entity::TEACHER,
        };
        audit::record(
            &mut tx,
            &actor,
            AuditEvent::new(
                AuditAction::Import,
                entity_type,
                format!("Imported {} {}", imported.len(), kind.as_str()),
            )
            .after(&imported),
        )
        .await?;
    }
    tx.commit().await?;

    info!(
        "[{}] Import of {}: {} imported, {} skipped, {} rejected",
        actor.alias,
        kind.as_str(),
        imported.len(),
        skipped,
        errors.len()
    );

    Ok(Json(CommitResponse {
        imported: imported.len(),
        skipped,
        errors,
    }))
}

pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/import/:kind/preview", post(preview))
        .route("/api/admin/import/:kind/commit", post(commit))
}
