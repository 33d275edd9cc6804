//! Vote validation
//!
//! Shape checks run before any candidate lookup; the gender check runs once
//! the candidate's record is known.

use abibuch_common::models::{AnswerMode, Gender, PersonKind, RankingQuestion, VoteSlot};
use thiserror::Error;

use crate::ApiError;

/// Reasons a vote is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("Question is not active")]
    InactiveQuestion,

    #[error("Slot {slot} is not valid for {mode} questions")]
    InvalidSlot { slot: VoteSlot, mode: AnswerMode },

    #[error("Duo questions need a partner")]
    PartnerRequired,

    #[error("Only duo questions take a partner")]
    UnexpectedPartner,

    #[error("Duo partners must be two different people")]
    SamePartner,

    #[error("You cannot vote for yourself")]
    SelfVote,

    #[error("Candidate {0} does not exist")]
    UnknownCandidate(String),

    #[error("Candidate gender {gender} does not fit slot {slot}")]
    GenderMismatch { gender: Gender, slot: VoteSlot },
}

impl From<VoteError> for ApiError {
    fn from(err: VoteError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Candidate guids in storage order: `(candidate, partner)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotePair {
    pub candidate_guid: String,
    pub partner_guid: Option<String>,
}

impl VotePair {
    /// Every guid referenced by the vote
    pub fn guids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.candidate_guid.as_str()).chain(self.partner_guid.as_deref())
    }
}

/// Check slot, partner and self-vote rules for one vote
///
/// Duo pairs are normalized so the smaller guid comes first; the same pair
/// entered in either order is therefore the same vote.
pub fn check_shape(
    question: &RankingQuestion,
    voter_guid: &str,
    slot: VoteSlot,
    candidate_guid: &str,
    partner_guid: Option<&str>,
) -> Result<VotePair, VoteError> {
    if !question.active {
        return Err(VoteError::InactiveQuestion);
    }

    if !question.answer_mode.slots().contains(&slot) {
        return Err(VoteError::InvalidSlot {
            slot,
            mode: question.answer_mode,
        });
    }

    let pair = match (question.answer_mode, partner_guid) {
        (AnswerMode::Duo, None) => return Err(VoteError::PartnerRequired),
        (AnswerMode::Duo, Some(partner)) => {
            if partner == candidate_guid {
                return Err(VoteError::SamePartner);
            }
            let (first, second) = if candidate_guid <= partner {
                (candidate_guid, partner)
            } else {
                (partner, candidate_guid)
            };
            VotePair {
                candidate_guid: first.to_string(),
                partner_guid: Some(second.to_string()),
            }
        }
        (_, Some(_)) => return Err(VoteError::UnexpectedPartner),
        (_, None) => VotePair {
            candidate_guid: candidate_guid.to_string(),
            partner_guid: None,
        },
    };

    if question.target == PersonKind::Student && pair.guids().any(|g| g == voter_guid) {
        return Err(VoteError::SelfVote);
    }

    Ok(pair)
}

/// Gender-specific slots only take candidates of that gender; gender D
/// candidates fit either slot
pub fn check_gender(slot: VoteSlot, gender: Gender) -> Result<(), VoteError> {
    let fits = match slot {
        VoteSlot::Any => true,
        VoteSlot::M => matches!(gender, Gender::M | Gender::D),
        VoteSlot::F => matches!(gender, Gender::F | Gender::D),
    };

    if fits {
        Ok(())
    } else {
        Err(VoteError::GenderMismatch { gender, slot })
    }
}
