//! Ranking vote aggregation
//!
//! Turns stored votes into per-question results:
//!
//! - SINGLE and DUO questions have one bucket (`ANY`), GENDER_SPECIFIC
//!   questions always have an `M` and an `F` bucket
//! - entries group votes by candidate, or by unordered pair for DUO
//! - entries are sorted by votes (desc) then display name (asc), ranked
//!   with standard competition ranking (1, 1, 3)
//! - percentages are relative to the bucket total, rounded to one decimal
//!
//! Votes whose candidate no longer resolves, or whose slot does not belong
//! to the question's current answer mode, are skipped.

use std::collections::HashMap;

use abibuch_common::models::{AnswerMode, PersonKind, RankingQuestion, VoteSlot};
use serde::Serialize;

use super::Vote;

/// Display names of everyone who can be voted for
#[derive(Debug, Clone, Default)]
pub struct CandidateDirectory {
    students: HashMap<String, String>,
    teachers: HashMap<String, String>,
}

impl CandidateDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: PersonKind, guid: impl Into<String>, name: impl Into<String>) {
        let map = match kind {
            PersonKind::Student => &mut self.students,
            PersonKind::Teacher => &mut self.teachers,
        };
        map.insert(guid.into(), name.into());
    }

    pub fn name(&self, kind: PersonKind, guid: &str) -> Option<&str> {
        let map = match kind {
            PersonKind::Student => &self.students,
            PersonKind::Teacher => &self.teachers,
        };
        map.get(guid).map(String::as_str)
    }
}

/// Candidate as shown in results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRef {
    pub guid: String,
    pub name: String,
}

/// One ranked candidate (or pair) within a bucket
#[derive(Debug, Clone, Serialize)]
pub struct ResultEntry {
    pub rank: usize,
    pub candidates: Vec<CandidateRef>,
    pub votes: usize,
    pub percentage: f64,
}

impl ResultEntry {
    /// Candidate names joined with " & "
    pub fn display_name(&self) -> String {
        self.candidates
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

/// Results for one slot of a question
#[derive(Debug, Clone, Serialize)]
pub struct BucketResult {
    pub slot: VoteSlot,
    pub total_votes: usize,
    pub entries: Vec<ResultEntry>,
}

/// Results for one question
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub question_guid: String,
    pub text: String,
    pub target: PersonKind,
    pub answer_mode: AnswerMode,
    pub total_votes: usize,
    pub buckets: Vec<BucketResult>,
}

/// Aggregate `votes` for `questions` (in the given order)
///
/// With `top`, only entries ranked `<= top` are kept, so ties at the cutoff
/// are all included. Bucket totals always count every vote.
pub fn aggregate(
    questions: &[RankingQuestion],
    votes: &[Vote],
    directory: &CandidateDirectory,
    top: Option<usize>,
) -> Vec<QuestionResult> {
    let mut by_question: HashMap<&str, Vec<&Vote>> = HashMap::new();
    for vote in votes {
        by_question
            .entry(vote.question_guid.as_str())
            .or_default()
            .push(vote);
    }

    questions
        .iter()
        .map(|question| {
            let question_votes = by_question
                .get(question.guid.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let buckets: Vec<BucketResult> = question
                .answer_mode
                .slots()
                .iter()
                .map(|slot| aggregate_bucket(question, *slot, question_votes, directory, top))
                .collect();

            QuestionResult {
                question_guid: question.guid.clone(),
                text: question.text.clone(),
                target: question.target,
                answer_mode: question.answer_mode,
                total_votes: buckets.iter().map(|b| b.total_votes).sum(),
                buckets,
            }
        })
        .collect()
}

fn aggregate_bucket(
    question: &RankingQuestion,
    slot: VoteSlot,
    votes: &[&Vote],
    directory: &CandidateDirectory,
    top: Option<usize>,
) -> BucketResult {
    // Keyed by guid list so a duo pair counts once regardless of entry order
    let mut tallies: HashMap<Vec<String>, (Vec<CandidateRef>, usize)> = HashMap::new();
    let mut total_votes = 0;

    for vote in votes.iter().filter(|v| v.slot == slot) {
        let Some(candidates) = resolve_candidates(question, vote, directory) else {
            continue;
        };

        let mut key: Vec<String> = candidates.iter().map(|c| c.guid.clone()).collect();
        key.sort();

        total_votes += 1;
        tallies
            .entry(key)
            .and_modify(|(_, count)| *count += 1)
            .or_insert((candidates, 1));
    }

    let mut entries: Vec<ResultEntry> = tallies
        .into_values()
        .map(|(candidates, count)| ResultEntry {
            rank: 0,
            candidates,
            votes: count,
            percentage: percentage(count, total_votes),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.display_name().cmp(&b.display_name()))
    });

    let mut previous_votes = None;
    let mut current_rank = 0;
    for (index, entry) in entries.iter_mut().enumerate() {
        if previous_votes != Some(entry.votes) {
            current_rank = index + 1;
            previous_votes = Some(entry.votes);
        }
        entry.rank = current_rank;
    }

    if let Some(top) = top {
        entries.retain(|e| e.rank <= top);
    }

    BucketResult {
        slot,
        total_votes,
        entries,
    }
}

/// Names for the vote's candidate(s), or `None` if any no longer exists
fn resolve_candidates(
    question: &RankingQuestion,
    vote: &Vote,
    directory: &CandidateDirectory,
) -> Option<Vec<CandidateRef>> {
    let lookup = |guid: &str| {
        directory.name(question.target, guid).map(|name| CandidateRef {
            guid: guid.to_string(),
            name: name.to_string(),
        })
    };

    let first = lookup(&vote.candidate_guid)?;

    match question.answer_mode {
        AnswerMode::Duo => {
            let second = lookup(vote.partner_guid.as_deref()?)?;
            let mut pair = vec![first, second];
            pair.sort_by(|a, b| a.name.cmp(&b.name));
            Some(pair)
        }
        AnswerMode::Single | AnswerMode::GenderSpecific => Some(vec![first]),
    }
}

fn percentage(votes: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 * 1000.0 / total as f64).round() / 10.0
}
