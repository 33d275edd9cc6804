//! Teacher reference data

use abibuch_common::models::{Gender, Teacher};
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

/// Editable teacher attributes
#[derive(Debug, Clone, Deserialize)]
pub struct TeacherInput {
    #[serde(default)]
    pub first_name: Option<String>,
    pub last_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub subject: Option<String>,
}

const TEACHER_COLUMNS: &str = "guid, first_name, last_name, gender, subject, created_at, updated_at";

pub async fn list(pool: &SqlitePool) -> Result<Vec<Teacher>> {
    let teachers = sqlx::query_as::<_, Teacher>(&format!(
        "SELECT {} FROM teachers ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE",
        TEACHER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(teachers)
}

pub async fn find<'e, E>(executor: E, guid: &str) -> Result<Option<Teacher>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let teacher = sqlx::query_as::<_, Teacher>(&format!(
        "SELECT {} FROM teachers WHERE guid = ?",
        TEACHER_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(executor)
    .await?;

    Ok(teacher)
}

pub async fn insert<'e, E>(executor: E, input: &TeacherInput) -> Result<Teacher>
where
    E: Executor<'e, Database = Sqlite>,
{
    let created_at = now();
    let teacher = Teacher {
        guid: uuid_utils::generate(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        gender: input.gender,
        subject: input.subject.clone(),
        created_at,
        updated_at: created_at,
    };

    sqlx::query(
        r#"
        INSERT INTO teachers (guid, first_name, last_name, gender, subject, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&teacher.guid)
    .bind(&teacher.first_name)
    .bind(&teacher.last_name)
    .bind(teacher.gender)
    .bind(&teacher.subject)
    .bind(to_db(teacher.created_at))
    .bind(to_db(teacher.updated_at))
    .execute(executor)
    .await?;

    Ok(teacher)
}

pub async fn update<'e, E>(executor: E, guid: &str, input: &TeacherInput) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE teachers
        SET first_name = ?, last_name = ?, gender = ?, subject = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.gender)
    .bind(&input.subject)
    .bind(to_db(now()))
    .bind(guid)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a teacher together with votes and quotes naming them
pub async fn delete(conn: &mut SqliteConnection, guid: &str) -> Result<bool> {
    sqlx::query(
        r#"
        DELETE FROM votes
        WHERE (candidate_guid = ?1 OR partner_guid = ?1)
          AND question_guid IN (SELECT guid FROM ranking_questions WHERE target = 'TEACHER')
        "#,
    )
    .bind(guid)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM quotes WHERE speaker_kind = 'TEACHER' AND speaker_guid = ?")
        .bind(guid)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM teachers WHERE guid = ?")
        .bind(guid)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teachers")
        .fetch_one(executor)
        .await?;

    Ok(count)
}
