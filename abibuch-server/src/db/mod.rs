//! Database repositories
//!
//! Single-statement functions take any sqlx executor so they run either on
//! the pool or inside a handler's transaction. Functions issuing several
//! statements take `&mut SqliteConnection`.

pub mod accounts;
pub mod activity;
pub mod audit;
pub mod comments;
pub mod fields;
pub mod photos;
pub mod profiles;
pub mod questions;
pub mod quotes;
pub mod students;
pub mod teachers;
pub mod votes;

use abibuch_common::models::PersonKind;
use abibuch_common::Result;
use sqlx::SqlitePool;

use crate::ranking::CandidateDirectory;

/// Display names of all students and teachers
pub async fn load_directory(pool: &SqlitePool) -> Result<CandidateDirectory> {
    let mut directory = CandidateDirectory::new();

    for student in students::list(pool).await? {
        directory.insert(PersonKind::Student, student.guid.clone(), student.display_name());
    }
    for teacher in teachers::list(pool).await? {
        directory.insert(PersonKind::Teacher, teacher.guid.clone(), teacher.display_name());
    }

    Ok(directory)
}
