//! Ranking questions

use abibuch_common::models::{AnswerMode, PersonKind, RankingQuestion};
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqliteConnection};

/// Editable question attributes
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub target: PersonKind,
    pub answer_mode: AnswerMode,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

const QUESTION_COLUMNS: &str =
    "guid, text, target, answer_mode, sort_order, active, created_at, updated_at";

/// Questions in display order
pub async fn list<'e, E>(executor: E, active_only: bool) -> Result<Vec<RankingQuestion>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let filter = if active_only { "WHERE active = 1" } else { "" };
    let questions = sqlx::query_as::<_, RankingQuestion>(&format!(
        "SELECT {} FROM ranking_questions {} ORDER BY sort_order, created_at",
        QUESTION_COLUMNS, filter
    ))
    .fetch_all(executor)
    .await?;

    Ok(questions)
}

pub async fn find<'e, E>(executor: E, guid: &str) -> Result<Option<RankingQuestion>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let question = sqlx::query_as::<_, RankingQuestion>(&format!(
        "SELECT {} FROM ranking_questions WHERE guid = ?",
        QUESTION_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(executor)
    .await?;

    Ok(question)
}

/// Append a question at the end of the order
pub async fn insert(conn: &mut SqliteConnection, input: &QuestionInput) -> Result<RankingQuestion> {
    let sort_order: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM ranking_questions")
            .fetch_one(&mut *conn)
            .await?;

    let created_at = now();
    let question = RankingQuestion {
        guid: uuid_utils::generate(),
        text: input.text.clone(),
        target: input.target,
        answer_mode: input.answer_mode,
        sort_order,
        active: input.active,
        created_at,
        updated_at: created_at,
    };

    sqlx::query(
        r#"
        INSERT INTO ranking_questions (guid, text, target, answer_mode, sort_order, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&question.guid)
    .bind(&question.text)
    .bind(question.target)
    .bind(question.answer_mode)
    .bind(question.sort_order)
    .bind(question.active)
    .bind(to_db(question.created_at))
    .bind(to_db(question.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(question)
}

pub async fn update<'e, E>(executor: E, guid: &str, input: &QuestionInput) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE ranking_questions
        SET text = ?, target = ?, answer_mode = ?, active = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&input.text)
    .bind(input.target)
    .bind(input.answer_mode)
    .bind(input.active)
    .bind(to_db(now()))
    .bind(guid)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every vote cast on a question; returns the number removed
pub async fn delete_votes<'e, E>(executor: E, guid: &str) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM votes WHERE question_guid = ?")
        .bind(guid)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Delete a question and close the gap it leaves in the order
pub async fn delete(conn: &mut SqliteConnection, guid: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ranking_questions WHERE guid = ?")
        .bind(guid)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    let remaining: Vec<String> =
        sqlx::query_scalar("SELECT guid FROM ranking_questions ORDER BY sort_order, created_at")
            .fetch_all(&mut *conn)
            .await?;
    reorder(conn, &remaining).await?;

    Ok(true)
}

/// Rewrite `sort_order` to 0..n following `order`
pub async fn reorder(conn: &mut SqliteConnection, order: &[String]) -> Result<()> {
    let updated_at = to_db(now());
    for (index, guid) in order.iter().enumerate() {
        sqlx::query("UPDATE ranking_questions SET sort_order = ?, updated_at = ? WHERE guid = ?")
            .bind(index as i64)
            .bind(&updated_at)
            .bind(guid)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
