//! UUID utilities
//!
//! Row identifiers are stored as lowercase hyphenated UUID text.

use uuid::Uuid;

/// Generate a new row identifier
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize a client-supplied identifier, rejecting anything that is not a UUID
pub fn normalize(s: &str) -> Option<String> {
    Uuid::parse_str(s.trim()).ok().map(|u| u.to_string())
}
