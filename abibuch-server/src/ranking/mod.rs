//! Peer ranking
//!
//! Students vote under thematic questions; admins read the tallies.
//! [`validate`] checks a single vote against its question's answer mode,
//! [`aggregate`] turns all stored votes into ranked results.

pub mod aggregate;
pub mod validate;

use abibuch_common::models::VoteSlot;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use aggregate::{aggregate, BucketResult, CandidateDirectory, CandidateRef, QuestionResult, ResultEntry};
pub use validate::{check_gender, check_shape, VoteError};

/// Stored vote
///
/// For duo questions `candidate_guid` is the lexically smaller guid of the
/// pair and `partner_guid` the larger one.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Vote {
    pub guid: String,
    pub voter_guid: String,
    pub question_guid: String,
    pub slot: VoteSlot,
    pub candidate_guid: String,
    pub partner_guid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
