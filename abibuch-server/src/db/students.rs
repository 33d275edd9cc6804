//! Student reference data

use abibuch_common::models::{Gender, Student};
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

/// Editable student attributes
#[derive(Debug, Clone, Deserialize)]
pub struct StudentInput {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub email: Option<String>,
}

const STUDENT_COLUMNS: &str = "guid, first_name, last_name, gender, email, created_at, updated_at";

/// All students sorted by last name, then first name
pub async fn list(pool: &SqlitePool) -> Result<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE",
        STUDENT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(students)
}

pub async fn find<'e, E>(executor: E, guid: &str) -> Result<Option<Student>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let student = sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE guid = ?",
        STUDENT_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(executor)
    .await?;

    Ok(student)
}

pub async fn insert<'e, E>(executor: E, input: &StudentInput) -> Result<Student>
where
    E: Executor<'e, Database = Sqlite>,
{
    let created_at = now();
    let student = Student {
        guid: uuid_utils::generate(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        gender: input.gender,
        email: input.email.clone(),
        created_at,
        updated_at: created_at,
    };

    sqlx::query(
        r#"
        INSERT INTO students (guid, first_name, last_name, gender, email, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&student.guid)
    .bind(&student.first_name)
    .bind(&student.last_name)
    .bind(student.gender)
    .bind(&student.email)
    .bind(to_db(student.created_at))
    .bind(to_db(student.updated_at))
    .execute(executor)
    .await?;

    Ok(student)
}

pub async fn update<'e, E>(executor: E, guid: &str, input: &StudentInput) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE students
        SET first_name = ?, last_name = ?, gender = ?, email = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.gender)
    .bind(&input.email)
    .bind(to_db(now()))
    .bind(guid)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a student with everything that refers to them
///
/// Rows owned by the student cascade through foreign keys. Votes and quotes
/// naming the student as candidate or speaker carry no foreign key and are
/// removed here.
pub async fn delete(conn: &mut SqliteConnection, guid: &str) -> Result<bool> {
    sqlx::query(
        r#"
        DELETE FROM votes
        WHERE (candidate_guid = ?1 OR partner_guid = ?1)
          AND question_guid IN (SELECT guid FROM ranking_questions WHERE target = 'STUDENT')
        "#,
    )
    .bind(guid)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM quotes WHERE speaker_kind = 'STUDENT' AND speaker_guid = ?")
        .bind(guid)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM students WHERE guid = ?")
        .bind(guid)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(executor)
        .await?;

    Ok(count)
}
