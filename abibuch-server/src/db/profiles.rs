//! Steckbrief submissions and field values

use std::collections::HashMap;

use abibuch_common::models::SubmissionStatus;
use abibuch_common::time::{now, to_db};
use abibuch_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

/// Submission state of a student's profile
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProfileState {
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileState {
    /// State of a student who has never saved anything
    pub fn draft() -> Self {
        Self {
            status: SubmissionStatus::Draft,
            submitted_at: None,
            updated_at: None,
        }
    }
}

/// Admin overview row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProfileOverview {
    pub student_guid: String,
    pub first_name: String,
    pub last_name: String,
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_fields: i64,
}

/// Profile state, `DRAFT` when no row exists yet
pub async fn state<'e, E>(executor: E, student_guid: &str) -> Result<ProfileState>
where
    E: Executor<'e, Database = Sqlite>,
{
    let state = sqlx::query_as::<_, ProfileState>(
        "SELECT status, submitted_at, updated_at FROM profiles WHERE student_guid = ?",
    )
    .bind(student_guid)
    .fetch_optional(executor)
    .await?;

    Ok(state.unwrap_or_else(ProfileState::draft))
}

/// Field guid to value for one student
pub async fn values<'e, E>(executor: E, student_guid: &str) -> Result<HashMap<String, String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT field_guid, value FROM profile_values WHERE student_guid = ?")
            .bind(student_guid)
            .fetch_all(executor)
            .await?;

    Ok(rows.into_iter().collect())
}

/// Create the profile row if missing and bump `updated_at`
pub async fn touch<'e, E>(executor: E, student_guid: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO profiles (student_guid, status, updated_at) VALUES (?, 'DRAFT', ?)
        ON CONFLICT(student_guid) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(student_guid)
    .bind(to_db(now()))
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn set_value<'e, E>(executor: E, student_guid: &str, field_guid: &str, value: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO profile_values (student_guid, field_guid, value, updated_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(student_guid, field_guid) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(student_guid)
    .bind(field_guid)
    .bind(value)
    .bind(to_db(now()))
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn clear_value<'e, E>(executor: E, student_guid: &str, field_guid: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM profile_values WHERE student_guid = ? AND field_guid = ?")
        .bind(student_guid)
        .bind(field_guid)
        .execute(executor)
        .await?;

    Ok(())
}

/// Set the submission status, creating the row if needed
pub async fn set_status<'e, E>(executor: E, student_guid: &str, status: SubmissionStatus) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let at = to_db(now());
    let submitted_at = (status == SubmissionStatus::Submitted).then(|| at.clone());

    sqlx::query(
        r#"
        INSERT INTO profiles (student_guid, status, submitted_at, updated_at) VALUES (?, ?, ?, ?)
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

/// One row per student, optionally filtered by status
pub async fn overview(pool: &SqlitePool, status: Option<SubmissionStatus>) -> Result<Vec<ProfileOverview>> {
    let rows = sqlx::query_as::<_, ProfileOverview>(
        r#"
        SELECT s.guid AS student_guid, s.first_name, s.last_name,
               COALESCE(p.status, 'DRAFT') AS status,
               p.submitted_at,
               (SELECT COUNT(*) FROM profile_values v
                 WHERE v.student_guid = s.guid AND TRIM(v.value) <> '') AS filled_fields
        FROM students s
        LEFT JOIN profiles p ON p.student_guid = s.guid
        WHERE ?1 IS NULL OR COALESCE(p.status, 'DRAFT') = ?1
        ORDER BY s.last_name COLLATE NOCASE, s.first_name COLLATE NOCASE
        "#,
    )
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Student with a submitted profile
#[derive(Debug, Clone, FromRow)]
pub struct SubmittedStudent {
    pub student_guid: String,
    pub first_name: String,
    pub last_name: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Students with a submitted profile, in name order
pub async fn submitted_students(pool: &SqlitePool) -> Result<Vec<SubmittedStudent>> {
    let rows = sqlx::query_as::<_, SubmittedStudent>(
        r#"
        SELECT s.guid AS student_guid, s.first_name, s.last_name, p.submitted_at
        FROM profiles p
        JOIN students s ON s.guid = p.student_guid
        WHERE p.status = 'SUBMITTED'
        ORDER BY s.last_name COLLATE NOCASE, s.first_name COLLATE NOCASE
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All stored values keyed by (student guid, field guid)
pub async fn all_values(pool: &SqlitePool) -> Result<HashMap<(String, String), String>> {
    let rows: Vec<(String, String, String)> =
        sqlx::query_as("SELECT student_guid, field_guid, value FROM profile_values")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(student, field, value)| ((student, field), value))
        .collect())
}

pub async fn count_submitted<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE status = 'SUBMITTED'")
        .fetch_one(executor)
        .await?;

    Ok(count)
}
