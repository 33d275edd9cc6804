//! Export downloads

use std::collections::HashMap;

use abibuch_common::models::{PersonKind, ReviewStatus};
use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use sqlx::SqlitePool;

use super::rankings::{compute_results, ResultsQuery};
use crate::auth::AdminUser;
use crate::db::{self, fields, photos, profiles, quotes};
use crate::export::{
    csv_response, profiles_csv, quotes_csv, rankings_csv, ExportPhoto, ExportValue, ProfileExport, QuoteExport,
};
use crate::{ApiResult, AppState};

/// GET /api/admin/export/rankings.csv?submitted_only=&top=
pub async fn export_rankings(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Response> {
    let results = compute_results(&state.db, &query).await?;
    Ok(csv_response("rankings.csv", rankings_csv(&results)?))
}

/// GET /api/admin/export/quotes.csv
///
/// Approved quotes only.
pub async fn export_quotes(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Response> {
    let directory = db::load_directory(&state.db).await?;

    let rows: Vec<QuoteExport> = quotes::list(&state.db, Some(ReviewStatus::Approved))
        .await?
        .into_iter()
        .map(|q| QuoteExport {
            speaker: directory
                .name(q.speaker_kind, &q.speaker_guid)
                .unwrap_or_default()
                .to_string(),
            submitted_by: directory
                .name(PersonKind::Student, &q.author_guid)
                .unwrap_or_default()
                .to_string(),
            text: q.text,
            created_at: q.created_at,
        })
        .collect();

    Ok(csv_response("quotes.csv", quotes_csv(&rows)?))
}

/// Field labels in order plus every submitted profile
async fn submitted_profiles(pool: &SqlitePool) -> ApiResult<(Vec<String>, Vec<ProfileExport>)> {
    let fields = fields::list(pool).await?;
    let mut values = profiles::all_values(pool).await?;

    let mut photos_by_student: HashMap<String, Vec<ExportPhoto>> = HashMap::new();
    for photo in photos::list(pool, None).await? {
        photos_by_student
            .entry(photo.student_guid)
            .or_default()
            .push(ExportPhoto {
                guid: photo.guid,
                category: photo.category,
                file_name: photo.file_name,
            });
    }

    let exports = profiles::submitted_students(pool)
        .await?
        .into_iter()
        .map(|s| ProfileExport {
            values: fields
                .iter()
                .map(|f| ExportValue {
                    field_guid: f.guid.clone(),
                    label: f.label.clone(),
                    value: values
                        .remove(&(s.student_guid.clone(), f.guid.clone()))
                        .unwrap_or_default(),
                })
                .collect(),
            photos: photos_by_student.remove(&s.student_guid).unwrap_or_default(),
            student_guid: s.student_guid,
            first_name: s.first_name,
            last_name: s.last_name,
            submitted_at: s.submitted_at,
        })
        .collect();

    let labels = fields.into_iter().map(|f| f.label).collect();
    Ok((labels, exports))
}

/// GET /api/admin/export/profiles.csv
pub async fn export_profiles_csv(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Response> {
    let (labels, exports) = submitted_profiles(&state.db).await?;
    Ok(csv_response("profiles.csv", profiles_csv(&labels, &exports)?))
}

/// GET /api/admin/export/profiles.json
pub async fn export_profiles_json(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<ProfileExport>>> {
    let (_, exports) = submitted_profiles(&state.db).await?;
    Ok(Json(exports))
}

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/export/rankings.csv", get(export_rankings))
        .route("/api/admin/export/quotes.csv", get(export_quotes))
        .route("/api/admin/export/profiles.csv", get(export_profiles_csv))
        .route("/api/admin/export/profiles.json", get(export_profiles_json))
}
