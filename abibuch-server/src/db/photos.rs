//! Photo records (files live in the uploads directory)

use abibuch_common::models::PhotoCategory;
use abibuch_common::time::to_db;
use abibuch_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Photo {
    pub guid: String,
    pub student_guid: String,
    pub category: PhotoCategory,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

const PHOTO_COLUMNS: &str =
    "guid, student_guid, category, file_name, content_type, size_bytes, created_at";

pub async fn insert<'e, E>(executor: E, photo: &Photo) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO photos (guid, student_guid, category, file_name, content_type, size_bytes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&photo.guid)
    .bind(&photo.student_guid)
    .bind(photo.category)
    .bind(&photo.file_name)
    .bind(&photo.content_type)
    .bind(photo.size_bytes)
    .bind(to_db(photo.created_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn find<'e, E>(executor: E, guid: &str) -> Result<Option<Photo>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let photo = sqlx::query_as::<_, Photo>(&format!(
        "SELECT {} FROM photos WHERE guid = ?",
        PHOTO_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(executor)
    .await?;

    Ok(photo)
}

/// Photos of one student, or of everyone when `student_guid` is `None`
pub async fn list<'e, E>(executor: E, student_guid: Option<&str>) -> Result<Vec<Photo>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let photos = sqlx::query_as::<_, Photo>(&format!(
        "SELECT {} FROM photos WHERE ?1 IS NULL OR student_guid = ?1 ORDER BY student_guid, category, created_at",
        PHOTO_COLUMNS
    ))
    .bind(student_guid)
    .fetch_all(executor)
    .await?;

    Ok(photos)
}

/// Delete a student's photos of one category, returning their file names
pub async fn delete_in_category<'e, E>(
    executor: E,
    student_guid: &str,
    category: PhotoCategory,
) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let names: Vec<String> =
        sqlx::query_scalar("DELETE FROM photos WHERE student_guid = ? AND category = ? RETURNING file_name")
            .bind(student_guid)
            .bind(category)
            .fetch_all(executor)
            .await?;

    Ok(names)
}

pub async fn count_in_category<'e, E>(executor: E, student_guid: &str, category: PhotoCategory) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE student_guid = ? AND category = ?")
        .bind(student_guid)
        .bind(category)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// Stored file names of a student's photos (for cleanup before deletion)
pub async fn file_names_for<'e, E>(executor: E, student_guid: &str) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let names: Vec<String> = sqlx::query_scalar("SELECT file_name FROM photos WHERE student_guid = ?")
        .bind(student_guid)
        .fetch_all(executor)
        .await?;

    Ok(names)
}

pub async fn delete<'e, E>(executor: E, guid: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM photos WHERE guid = ?")
        .bind(guid)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
