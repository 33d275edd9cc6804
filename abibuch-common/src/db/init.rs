//! Database initialization
//!
//! Creates the database on first run and brings the schema up to date on
//! every start. All `CREATE TABLE` statements are idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // foreign_keys is a per-connection pragma, so it is set on the connect
    // options and applied to every pooled connection.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema_version_table(&pool).await?;
    create_settings_table(&pool).await?;

    // Reference data
    create_students_table(&pool).await?;
    create_teachers_table(&pool).await?;
    create_ranking_questions_table(&pool).await?;
    create_profile_fields_table(&pool).await?;

    // Accounts
    create_users_table(&pool).await?;
    create_sessions_table(&pool).await?;

    // Student submissions
    create_profiles_tables(&pool).await?;
    create_votes_tables(&pool).await?;
    create_quotes_table(&pool).await?;
    create_comments_table(&pool).await?;
    create_photos_table(&pool).await?;

    create_audit_log_table(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime key-value settings such as the submission deadline.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            guid TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            gender TEXT NOT NULL CHECK (gender IN ('M', 'F', 'D')),
            email TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_students_name ON students(last_name, first_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_teachers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teachers (
            guid TEXT PRIMARY KEY,
            first_name TEXT,
            last_name TEXT NOT NULL,
            gender TEXT NOT NULL CHECK (gender IN ('M', 'F', 'D')),
            subject TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ranking_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ranking_questions (
            guid TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            target TEXT NOT NULL CHECK (target IN ('STUDENT', 'TEACHER')),
            answer_mode TEXT NOT NULL CHECK (answer_mode IN ('SINGLE', 'GENDER_SPECIFIC', 'DUO')),
            sort_order INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_profile_fields_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profile_fields (
            guid TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            field_type TEXT NOT NULL CHECK (field_type IN ('TEXT', 'LONG_TEXT')),
            max_length INTEGER NOT NULL DEFAULT 500,
            required INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('STUDENT', 'ADMIN')),
            student_guid TEXT UNIQUE REFERENCES students(guid) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_profiles_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            student_guid TEXT PRIMARY KEY REFERENCES students(guid) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'SUBMITTED')),
            submitted_at TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profile_values (
            student_guid TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            field_guid TEXT NOT NULL REFERENCES profile_fields(guid) ON DELETE CASCADE,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (student_guid, field_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_votes_tables(pool: &SqlitePool) -> Result<()> {
    // Candidates reference either students or teachers depending on the
    // question target, so candidate columns carry no foreign key. Dangling
    // votes are removed when a person is deleted.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            guid TEXT PRIMARY KEY,
            voter_guid TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            question_guid TEXT NOT NULL REFERENCES ranking_questions(guid) ON DELETE CASCADE,
            slot TEXT NOT NULL CHECK (slot IN ('ANY', 'M', 'F')),
            candidate_guid TEXT NOT NULL,
            partner_guid TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (voter_guid, question_guid, slot)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_votes_question ON votes(question_guid)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ranking_submissions (
            student_guid TEXT PRIMARY KEY REFERENCES students(guid) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'SUBMITTED')),
            submitted_at TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_quotes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quotes (
            guid TEXT PRIMARY KEY,
            author_guid TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            speaker_kind TEXT NOT NULL CHECK (speaker_kind IN ('STUDENT', 'TEACHER')),
            speaker_guid TEXT NOT NULL,
            text TEXT NOT NULL,
            context TEXT,
            status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
            created_at TEXT NOT NULL,
            reviewed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            guid TEXT PRIMARY KEY,
            author_guid TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            target_guid TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            text TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            reviewed_at TEXT,
            UNIQUE (author_guid, target_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_photos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photos (
            guid TEXT PRIMARY KEY,
            student_guid TEXT NOT NULL REFERENCES students(guid) ON DELETE CASCADE,
            category TEXT NOT NULL CHECK (category IN ('PORTRAIT', 'CHILDHOOD', 'FREE')),
            file_name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_photos_student ON photos(student_guid)")
        .execute(pool)
        .await?;

    // One PORTRAIT and one CHILDHOOD per student; FREE is limited in code
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_photos_single_category
        ON photos(student_guid, category) WHERE category <> 'FREE'
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_audit_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            guid TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            admin_guid TEXT NOT NULL,
            alias TEXT NOT NULL,
            action TEXT NOT NULL CHECK (action IN ('CREATE', 'UPDATE', 'DELETE', 'REORDER', 'IMPORT')),
            entity_type TEXT NOT NULL,
            entity_guid TEXT,
            summary TEXT NOT NULL,
            before_json TEXT,
            after_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
