//! CSV import pipeline for students and teachers
//!
//! 1. [`rows::parse_csv`] reads the file (delimiter sniffed from the header)
//! 2. [`headers::match_headers`] maps columns to import fields
//! 3. [`rows::map_rows`] turns records into validated [`rows::ImportRow`]s
//!
//! Preview runs all three without touching the database. Commit takes the
//! (possibly edited) rows back from the client, revalidates them and inserts
//! the valid ones in one transaction.

pub mod headers;
pub mod rows;

use thiserror::Error;

use crate::ApiError;

pub use headers::{match_headers, normalize_header, HeaderMatch};
pub use rows::{duplicate_key, map_rows, parse_csv, validate_values, ImportRow, ParsedCsv};

/// What is being imported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Students,
    Teachers,
}

/// Target field of an import
#[derive(Debug, Clone, Copy)]
pub struct ImportField {
    pub name: &'static str,
    pub required: bool,
    /// Normalized header spellings that map to this field
    pub aliases: &'static [&'static str],
}

const FIRST_NAME_ALIASES: &[&str] = &["vorname", "firstname", "first", "givenname"];
const LAST_NAME_ALIASES: &[&str] = &["nachname", "lastname", "surname", "familienname", "name"];
const GENDER_ALIASES: &[&str] = &["geschlecht", "gender", "sex", "anrede"];
const EMAIL_ALIASES: &[&str] = &["email", "mail", "emailadresse"];
const SUBJECT_ALIASES: &[&str] = &["fach", "subject", "faecher"];

const STUDENT_FIELDS: &[ImportField] = &[
    ImportField { name: "first_name", required: true, aliases: FIRST_NAME_ALIASES },
    ImportField { name: "last_name", required: true, aliases: LAST_NAME_ALIASES },
    ImportField { name: "gender", required: true, aliases: GENDER_ALIASES },
    ImportField { name: "email", required: false, aliases: EMAIL_ALIASES },
];

const TEACHER_FIELDS: &[ImportField] = &[
    ImportField { name: "first_name", required: false, aliases: FIRST_NAME_ALIASES },
    ImportField { name: "last_name", required: true, aliases: LAST_NAME_ALIASES },
    ImportField { name: "gender", required: true, aliases: GENDER_ALIASES },
    ImportField { name: "subject", required: false, aliases: SUBJECT_ALIASES },
];

/// Longest accepted value for any imported field
pub const MAX_VALUE_LENGTH: usize = 100;

impl ImportKind {
    /// Parse the `:kind` path segment
    pub fn from_path(value: &str) -> Result<Self, ImportError> {
        match value {
            "students" => Ok(ImportKind::Students),
            "teachers" => Ok(ImportKind::Teachers),
            other => Err(ImportError::UnknownKind(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Students => "students",
            ImportKind::Teachers => "teachers",
        }
    }

    /// Import fields in column-matching priority order
    pub fn fields(&self) -> &'static [ImportField] {
        match self {
            ImportKind::Students => STUDENT_FIELDS,
            ImportKind::Teachers => TEACHER_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static ImportField> {
        self.fields().iter().find(|f| f.name == name)
    }
}

/// Import failures that reject the whole request
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unknown import kind '{0}'")]
    UnknownKind(String),

    #[error("The CSV file is empty")]
    Empty,

    #[error("Unknown import field '{0}'")]
    UnknownField(String),

    #[error("Column '{0}' does not exist in the file")]
    UnknownHeader(String),

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
