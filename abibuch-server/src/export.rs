//! CSV and JSON exports for the yearbook layout team

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ranking::QuestionResult;
use crate::{ApiError, ApiResult};

/// Header row of the ranking export
pub const RANKING_HEADER: [&str; 6] = ["question", "bucket", "rank", "name", "votes", "percentage"];

/// Header row of the quotes export
pub const QUOTES_HEADER: [&str; 4] = ["speaker", "text", "submitted_by", "created_at"];

/// Downloadable CSV response
pub fn csv_response(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> ApiResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("Failed to finish CSV: {}", e)))
}

/// One line per ranked entry; duo names are joined with " & "
pub fn rankings_csv(results: &[QuestionResult]) -> ApiResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(RANKING_HEADER)?;

    for question in results {
        for bucket in &question.buckets {
            for entry in &bucket.entries {
                writer.write_record([
                    question.text.clone(),
                    bucket.slot.to_string(),
                    entry.rank.to_string(),
                    entry.display_name(),
                    entry.votes.to_string(),
                    format!("{:.1}", entry.percentage),
                ])?;
            }
        }
    }

    finish(writer)
}

/// Approved quote as exported
#[derive(Debug, Clone, Serialize)]
pub struct QuoteExport {
    pub speaker: String,
    pub text: String,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
}

pub fn quotes_csv(quotes: &[QuoteExport]) -> ApiResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(QUOTES_HEADER)?;

    for quote in quotes {
        writer.write_record([
            quote.speaker.as_str(),
            quote.text.as_str(),
            quote.submitted_by.as_str(),
            abibuch_common::time::to_db(quote.created_at).as_str(),
        ])?;
    }

    finish(writer)
}

/// Value of one Steckbrief field
#[derive(Debug, Clone, Serialize)]
pub struct ExportValue {
    pub field_guid: String,
    pub label: String,
    pub value: String,
}

/// Photo reference in the JSON export
#[derive(Debug, Clone, Serialize)]
pub struct ExportPhoto {
    pub guid: String,
    pub category: abibuch_common::models::PhotoCategory,
    pub file_name: String,
}

/// Submitted profile with values in field order
#[derive(Debug, Clone, Serialize)]
pub struct ProfileExport {
    pub student_guid: String,
    pub first_name: String,
    pub last_name: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub values: Vec<ExportValue>,
    pub photos: Vec<ExportPhoto>,
}

/// `last_name,first_name,<labels...>`; `labels` must be in field order and
/// each profile must carry one value per label
pub fn profiles_csv(labels: &[String], profiles: &[ProfileExport]) -> ApiResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header_row = vec!["last_name".to_string(), "first_name".to_string()];
    header_row.extend(labels.iter().cloned());
    writer.write_record(&header_row)?;

    for profile in profiles {
        let mut row = vec![profile.last_name.clone(), profile.first_name.clone()];
        row.extend(profile.values.iter().map(|v| v.value.clone()));
        writer.write_record(&row)?;
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{BucketResult, CandidateRef, ResultEntry};
    use abibuch_common::models::{AnswerMode, PersonKind, VoteSlot};
    use chrono::TimeZone;

    fn entry(rank: usize, names: &[&str], votes: usize, percentage: f64) -> ResultEntry {
        ResultEntry {
            rank,
            candidates: names
                .iter()
                .map(|n| CandidateRef {
                    guid: n.to_lowercase(),
                    name: n.to_string(),
                })
                .collect(),
            votes,
            percentage,
        }
    }

    #[test]
    fn test_rankings_csv() {
        let results = vec![QuestionResult {
            question_guid: "q".to_string(),
            text: "Traumpaar, für immer".to_string(),
            target: PersonKind::Student,
            answer_mode: AnswerMode::Duo,
            total_votes: 3,
            buckets: vec![BucketResult {
                slot: VoteSlot::Any,
                total_votes: 3,
                entries: vec![
                    entry(1, &["Anna", "Ben"], 2, 66.7),
                    entry(2, &["Cara", "Dave"], 1, 33.3),
                ],
            }],
        }];

        let csv = String::from_utf8(rankings_csv(&results).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "question,bucket,rank,name,votes,percentage");
        assert_eq!(lines[1], "\"Traumpaar, für immer\",ANY,1,Anna & Ben,2,66.7");
        assert_eq!(lines[2], "\"Traumpaar, für immer\",ANY,2,Cara & Dave,1,33.3");
    }

    #[test]
    fn test_whole_percentages_keep_one_decimal() {
        let results = vec![QuestionResult {
            question_guid: "q".to_string(),
            text: "Q".to_string(),
            target: PersonKind::Teacher,
            answer_mode: AnswerMode::Single,
            total_votes: 1,
            buckets: vec![BucketResult {
                slot: VoteSlot::Any,
                total_votes: 1,
                entries: vec![entry(1, &["Herr Meier"], 1, 100.0)],
            }],
        }];
        let csv = String::from_utf8(rankings_csv(&results).unwrap()).unwrap();
        assert!(csv.ends_with("Q,ANY,1,Herr Meier,1,100.0\n"));
    }

    #[test]
    fn test_quotes_csv_escapes() {
        let quotes = vec![QuoteExport {
            speaker: "Frau Schulz".to_string(),
            text: "Das ist \"nicht\" klausurrelevant".to_string(),
            submitted_by: "Anna Berg".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 2, 3, 8, 0, 0).unwrap(),
        }];
        let csv = String::from_utf8(quotes_csv(&quotes).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "speaker,text,submitted_by,created_at");
        assert_eq!(
            lines[1],
            "Frau Schulz,\"Das ist \"\"nicht\"\" klausurrelevant\",Anna Berg,2026-02-03T08:00:00.000000Z"
        );
    }

    #[test]
    fn test_profiles_csv_columns_follow_labels() {
        let labels = vec!["Spitzname".to_string(), "Lebensmotto".to_string()];
        let profiles = vec![ProfileExport {
            student_guid: "s".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Berg".to_string(),
            submitted_at: None,
            values: vec![
                ExportValue {
                    field_guid: "f1".to_string(),
                    label: "Spitzname".to_string(),
                    value: "Anni".to_string(),
                },
                ExportValue {
                    field_guid: "f2".to_string(),
                    label: "Lebensmotto".to_string(),
                    value: String::new(),
                },
            ],
            photos: Vec::new(),
        }];

        let csv = String::from_utf8(profiles_csv(&labels, &profiles).unwrap()).unwrap();
        assert_eq!(csv, "last_name,first_name,Spitzname,Lebensmotto\nBerg,Anna,Anni,\n");
    }
}
