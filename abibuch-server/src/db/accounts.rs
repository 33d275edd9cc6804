//! User accounts and login sessions

use abibuch_common::models::Role;
use abibuch_common::password::{generate_salt, generate_token, hash_password, verify_password};
use abibuch_common::time::{now, to_db};
use abibuch_common::{uuid_utils, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::debug;

use crate::auth::CurrentUser;

/// Account without credentials
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub guid: String,
    pub username: String,
    pub role: Role,
    pub student_guid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct Credentials {
    guid: String,
    password_hash: String,
    password_salt: String,
}

const ACCOUNT_COLUMNS: &str = "guid, username, role, student_guid, created_at, updated_at";

pub async fn list(pool: &SqlitePool) -> Result<Vec<Account>> {
    let accounts = sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM users ORDER BY role, username COLLATE NOCASE",
        ACCOUNT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}

pub async fn find<'e, E>(executor: E, guid: &str) -> Result<Option<Account>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM users WHERE guid = ?",
        ACCOUNT_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}

/// Case-insensitive username lookup
pub async fn find_by_username<'e, E>(executor: E, username: &str) -> Result<Option<Account>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM users WHERE username = ?",
        ACCOUNT_COLUMNS
    ))
    .bind(username)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}

/// Account linked to a student record
pub async fn find_by_student<'e, E>(executor: E, student_guid: &str) -> Result<Option<Account>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM users WHERE student_guid = ?",
        ACCOUNT_COLUMNS
    ))
    .bind(student_guid)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}

/// Create an account with a freshly salted password hash
///
/// Callers check username uniqueness and password length first.
pub async fn insert<'e, E>(
    executor: E,
    username: &str,
    password: &str,
    role: Role,
    student_guid: Option<&str>,
) -> Result<Account>
where
    E: Executor<'e, Database = Sqlite>,
{
    let created_at = now();
    let account = Account {
        guid: uuid_utils::generate(),
        username: username.to_string(),
        role,
        student_guid: student_guid.map(str::to_string),
        created_at,
        updated_at: created_at,
    };
    let salt = generate_salt();
    let hash = hash_password(password, &salt);

    sqlx::query(
        r#"
        INSERT INTO users (guid, username, password_hash, password_salt, role, student_guid, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&account.guid)
    .bind(&account.username)
    .bind(&hash)
    .bind(&salt)
    .bind(account.role)
    .bind(&account.student_guid)
    .bind(to_db(account.created_at))
    .bind(to_db(account.updated_at))
    .execute(executor)
    .await?;

    Ok(account)
}

/// Replace a password; returns false when the account does not exist
pub async fn set_password<'e, E>(executor: E, guid: &str, password: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let salt = generate_salt();
    let hash = hash_password(password, &salt);

    let result = sqlx::query(
        "UPDATE users SET password_hash = ?, password_salt = ?, updated_at = ? WHERE guid = ?",
    )
    .bind(&hash)
    .bind(&salt)
    .bind(to_db(now()))
    .bind(guid)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete<'e, E>(executor: E, guid: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM users WHERE guid = ?")
        .bind(guid)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_admins<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'ADMIN'")
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// Check a username/password pair
///
/// Unknown users and wrong passwords both yield `None`.
pub async fn verify_credentials(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<Account>> {
    let credentials = sqlx::query_as::<_, Credentials>(
        "SELECT guid, password_hash, password_salt FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let Some(credentials) = credentials else {
        return Ok(None);
    };

    if !verify_password(password, &credentials.password_salt, &credentials.password_hash) {
        return Ok(None);
    }

    find(pool, &credentials.guid).await
}

/// Start a session and return its token
pub async fn create_session(pool: &SqlitePool, user_guid: &str, ttl_hours: i64) -> Result<String> {
    let token = generate_token();
    let created_at = now();
    let expires_at = created_at + Duration::hours(ttl_hours);

    sqlx::query("INSERT INTO sessions (token, user_guid, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_guid)
        .bind(to_db(created_at))
        .bind(to_db(expires_at))
        .execute(pool)
        .await?;

    Ok(token)
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// End every session of a user (after a password reset)
pub async fn delete_sessions_for<'e, E>(executor: E, user_guid: &str) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM sessions WHERE user_guid = ?")
        .bind(user_guid)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Resolve a session token, purging it if it has expired
pub async fn find_session_user(
    pool: &SqlitePool,
    token: &str,
    at: DateTime<Utc>,
) -> Result<Option<CurrentUser>> {
    let user = sqlx::query_as::<_, CurrentUser>(
        r#"
        SELECT u.guid, u.username, u.role, u.student_guid
        FROM sessions s
        JOIN users u ON u.guid = s.user_guid
        WHERE s.token = ? AND s.expires_at > ?
        "#,
    )
    .bind(token)
    .bind(to_db(at))
    .fetch_optional(pool)
    .await?;

    if user.is_none() {
        let purged = sqlx::query("DELETE FROM sessions WHERE token = ? AND expires_at <= ?")
            .bind(token)
            .bind(to_db(at))
            .execute(pool)
            .await?
            .rows_affected();
        if purged > 0 {
            debug!("Purged expired session");
        }
    }

    Ok(user)
}

/// Remove all expired sessions
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(to_db(now()))
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
