//! Steckbrief field definitions

use abibuch_common::models::{FieldType, ProfileField};
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqliteConnection};

/// Default maximum value length in characters
pub const DEFAULT_MAX_LENGTH: i64 = 500;

/// Editable field attributes
#[derive(Debug, Clone, Deserialize)]
pub struct FieldInput {
    pub label: String,
    pub field_type: FieldType,
    #[serde(default = "default_max_length")]
    pub max_length: i64,
    #[serde(default)]
    pub required: bool,
}

fn default_max_length() -> i64 {
    DEFAULT_MAX_LENGTH
}

const FIELD_COLUMNS: &str =
    "guid, label, field_type, max_length, required, sort_order, created_at, updated_at";

/// Fields in display order
pub async fn list<'e, E>(executor: E) -> Result<Vec<ProfileField>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let fields = sqlx::query_as::<_, ProfileField>(&format!(
        "SELECT {} FROM profile_fields ORDER BY sort_order, created_at",
        FIELD_COLUMNS
    ))
    .fetch_all(executor)
    .await?;

    Ok(fields)
}

pub async fn find<'e, E>(executor: E, guid: &str) -> Result<Option<ProfileField>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let field = sqlx::query_as::<_, ProfileField>(&format!(
        "SELECT {} FROM profile_fields WHERE guid = ?",
        FIELD_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(executor)
    .await?;

    Ok(field)
}

/// Append a field at the end of the order
pub async fn insert(conn: &mut SqliteConnection, input: &FieldInput) -> Result<ProfileField> {
    let sort_order: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM profile_fields")
            .fetch_one(&mut *conn)
            .await?;

    let created_at = now();
    let field = ProfileField {
        guid: uuid_utils::generate(),
        label: input.label.clone(),
        field_type: input.field_type,
        max_length: input.max_length,
        required: input.required,
        sort_order,
        created_at,
        updated_at: created_at,
    };

    sqlx::query(
        r#"
        INSERT INTO profile_fields (guid, label, field_type, max_length, required, sort_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&field.guid)
    .bind(&field.label)
    .bind(field.field_type)
    .bind(field.max_length)
    .bind(field.required)
    .bind(field.sort_order)
    .bind(to_db(field.created_at))
    .bind(to_db(field.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(field)
}

pub async fn update<'e, E>(executor: E, guid: &str, input: &FieldInput) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE profile_fields
        SET label = ?, field_type = ?, max_length = ?, required = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&input.label)
    .bind(input.field_type)
    .bind(input.max_length)
    .bind(input.required)
    .bind(to_db(now()))
    .bind(guid)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a field (its values cascade) and close the gap in the order
pub async fn delete(conn: &mut SqliteConnection, guid: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM profile_fields WHERE guid = ?")
        .bind(guid)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    let remaining: Vec<String> =
        sqlx::query_scalar("SELECT guid FROM profile_fields ORDER BY sort_order, created_at")
            .fetch_all(&mut *conn)
            .await?;
    reorder(conn, &remaining).await?;

    Ok(true)
}

/// Rewrite `sort_order` to 0..n following `order`
pub async fn reorder(conn: &mut SqliteConnection, order: &[String]) -> Result<()> {
    let updated_at = to_db(now());
    for (index, guid) in order.iter().enumerate() {
        sqlx::query("UPDATE profile_fields SET sort_order = ?, updated_at = ? WHERE guid = ?")
            .bind(index as i64)
            .bind(&updated_at)
            .bind(guid)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
