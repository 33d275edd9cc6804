//! Key-value settings stored in the `settings` table

use crate::Result;
use sqlx::{Executor, Sqlite};

/// Settings key holding the submission deadline (RFC 3339)
pub const SUBMISSION_DEADLINE_KEY: &str = "submission_deadline";

/// Read a setting; NULL and missing rows both yield `None`
pub async fn get_setting<'e, E>(executor: E, key: &str) -> Result<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(executor)
            .await?;

    Ok(value.flatten())
}

/// Insert or replace a setting
pub async fn set_setting<'e, E>(executor: E, key: &str, value: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;

    Ok(())
}

/// Remove a setting
pub async fn delete_setting<'e, E>(executor: E, key: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(executor)
        .await?;

    Ok(())
}
