//! Domain enums and reference-data models
//!
//! Enums are stored as upper-case TEXT columns and serialized with the same
//! names in JSON (`"GENDER_SPECIFIC"`, `"PORTRAIT"`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        #[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// All variants in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Parse the canonical upper-case name
            pub fn parse(value: &str) -> Result<Self> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        "Unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Gender of a student or teacher
    pub enum Gender {
        M => "M",
        F => "F",
        D => "D",
    }
}

impl Gender {
    /// Lenient parsing for imported or hand-typed values
    ///
    /// Accepts German and English spellings and salutations.
    pub fn from_input(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "m" | "male" | "männlich" | "maennlich" | "mann" | "herr" | "hr" | "hr." => Some(Gender::M),
            "f" | "w" | "female" | "weiblich" | "frau" | "fr" | "fr." => Some(Gender::F),
            "d" | "divers" | "diverse" | "x" => Some(Gender::D),
            _ => None,
        }
    }
}

text_enum! {
    /// Account role
    pub enum Role {
        Student => "STUDENT",
        Admin => "ADMIN",
    }
}

text_enum! {
    /// Kind of person a question, quote or candidate refers to
    pub enum PersonKind {
        Student => "STUDENT",
        Teacher => "TEACHER",
    }
}

text_enum! {
    /// How a ranking question is answered
    pub enum AnswerMode {
        /// One candidate
        Single => "SINGLE",
        /// One male and one female candidate
        GenderSpecific => "GENDER_SPECIFIC",
        /// A pair of candidates
        Duo => "DUO",
    }
}

text_enum! {
    /// Vote slot within a question
    pub enum VoteSlot {
        Any => "ANY",
        M => "M",
        F => "F",
    }
}

impl AnswerMode {
    /// Slots a voter fills for this answer mode
    pub fn slots(&self) -> &'static [VoteSlot] {
        match self {
            AnswerMode::Single | AnswerMode::Duo => &[VoteSlot::Any],
            AnswerMode::GenderSpecific => &[VoteSlot::M, VoteSlot::F],
        }
    }
}

text_enum! {
    /// Status of a student's profile or ranking submission
    pub enum SubmissionStatus {
        Draft => "DRAFT",
        Submitted => "SUBMITTED",
    }
}

text_enum! {
    /// Moderation status of quotes and comments
    pub enum ReviewStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

text_enum! {
    /// Photo category
    pub enum PhotoCategory {
        Portrait => "PORTRAIT",
        Childhood => "CHILDHOOD",
        Free => "FREE",
    }
}

impl PhotoCategory {
    /// PORTRAIT and CHILDHOOD hold one photo each; FREE holds several
    pub fn is_single(&self) -> bool {
        !matches!(self, PhotoCategory::Free)
    }
}

text_enum! {
    /// Admin action recorded in the audit log
    pub enum AuditAction {
        Create => "CREATE",
        Update => "UPDATE",
        Delete => "DELETE",
        Reorder => "REORDER",
        Import => "IMPORT",
    }
}

text_enum! {
    /// Input type of a profile field
    pub enum FieldType {
        Text => "TEXT",
        LongText => "LONG_TEXT",
    }
}

/// Student reference record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub guid: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Teacher reference record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Teacher {
    pub guid: String,
    pub first_name: Option<String>,
    pub last_name: String,
    pub gender: Gender,
    pub subject: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Teacher {
    /// "Herr Meier", "Frau Schulz", or "Alex Kim" for gender D
    pub fn display_name(&self) -> String {
        match self.gender {
            Gender::M => format!("Herr {}", self.last_name),
            Gender::F => format!("Frau {}", self.last_name),
            Gender::D => match &self.first_name {
                Some(first) if !first.trim().is_empty() => {
                    format!("{} {}", first, self.last_name)
                }
                _ => self.last_name.clone(),
            },
        }
    }
}

/// Ranking question
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RankingQuestion {
    pub guid: String,
    pub text: String,
    pub target: PersonKind,
    pub answer_mode: AnswerMode,
    pub sort_order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Steckbrief field definition
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileField {
    pub guid: String,
    pub label: String,
    pub field_type: FieldType,
    pub max_length: i64,
    pub required: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        assert_eq!(AnswerMode::parse("GENDER_SPECIFIC").unwrap(), AnswerMode::GenderSpecific);
        assert_eq!(PhotoCategory::parse("FREE").unwrap(), PhotoCategory::Free);
        assert!(AuditAction::parse("create").is_err());
    }

    #[test]
    fn test_serde_names_match_text() {
        for mode in AnswerMode::ALL {
            let json = serde_json::to_string(mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
        }
        let status: ReviewStatus = serde_json::from_str("\"APPROVED\"").unwrap();
        assert_eq!(status, ReviewStatus::Approved);
    }

    #[test]
    fn test_gender_from_input() {
        assert_eq!(Gender::from_input("w"), Some(Gender::F));
        assert_eq!(Gender::from_input(" Männlich "), Some(Gender::M));
        assert_eq!(Gender::from_input("Herr"), Some(Gender::M));
        assert_eq!(Gender::from_input("divers"), Some(Gender::D));
        assert_eq!(Gender::from_input("?"), None);
    }

    #[test]
    fn test_slots_per_mode() {
        assert_eq!(AnswerMode::Single.slots(), &[VoteSlot::Any]);
        assert_eq!(AnswerMode::Duo.slots(), &[VoteSlot::Any]);
        assert_eq!(AnswerMode::GenderSpecific.slots(), &[VoteSlot::M, VoteSlot::F]);
    }

    #[test]
    fn test_teacher_display_name() {
        let now = Utc::now();
        let mut teacher = Teacher {
            guid: "t".to_string(),
            first_name: Some("Alex".to_string()),
            last_name: "Kim".to_string(),
            gender: Gender::F,
            subject: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(teacher.display_name(), "Frau Kim");
        teacher.gender = Gender::D;
        assert_eq!(teacher.display_name(), "Alex Kim");
        teacher.first_name = None;
        assert_eq!(teacher.display_name(), "Kim");
    }
}
