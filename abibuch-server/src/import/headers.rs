//! Header matching
//!
//! Column headers from school exports vary ("Vorname", "First Name",
//! "E-Mail-Adresse", ...). Headers are normalized and compared against each
//! field's alias list. The client can override any mapping explicitly.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::{ImportError, ImportKind};

/// Lowercase, fold German umlauts and ß, drop everything but letters and digits
///
/// ```
/// use abibuch_server::import::normalize_header;
///
/// assert_eq!(normalize_header(" E-Mail-Adresse "), "emailadresse");
/// assert_eq!(normalize_header("Fächer"), "faecher");
/// ```
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().to_lowercase().chars() {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            c if c.is_alphanumeric() => out.push(c),
            _ => {}
        }
    }
    out
}

/// Result of matching file headers to import fields
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeaderMatch {
    /// Field name to header text
    pub mapping: BTreeMap<&'static str, String>,
    /// Headers not mapped to any field
    pub unmatched_headers: Vec<String>,
    /// Required fields without a column
    pub missing_fields: Vec<&'static str>,
    /// Field name to column index
    #[serde(skip)]
    pub columns: BTreeMap<&'static str, usize>,
}

/// Map `headers` to the fields of `kind`
///
/// `overrides` maps field name to header text. An empty header text leaves
/// the field unmapped. Overridden fields and their headers are excluded from
/// auto-matching; otherwise headers are scanned left to right and the first
/// header matching a field wins.
pub fn match_headers(
    kind: ImportKind,
    headers: &[String],
    overrides: &HashMap<String, String>,
) -> Result<HeaderMatch, ImportError> {
    let mut result = HeaderMatch::default();
    let mut used_columns: HashSet<usize> = HashSet::new();
    let mut settled_fields: HashSet<&'static str> = HashSet::new();

    // Sorted so the outcome does not depend on HashMap iteration order
    let mut explicit: Vec<(&String, &String)> = overrides.iter().collect();
    explicit.sort();

    for (field_name, header) in explicit {
        let field = kind
            .field(field_name)
            .ok_or_else(|| ImportError::UnknownField(field_name.clone()))?;
        settled_fields.insert(field.name);

        if header.trim().is_empty() {
            continue;
        }

        let column = find_column(headers, header, &used_columns)
            .ok_or_else(|| ImportError::UnknownHeader(header.clone()))?;
        used_columns.insert(column);
        result.mapping.insert(field.name, headers[column].clone());
        result.columns.insert(field.name, column);
    }

    for (column, header) in headers.iter().enumerate() {
        if used_columns.contains(&column) {
            continue;
        }
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            continue;
        }

        let matched = kind.fields().iter().find(|field| {
            !settled_fields.contains(field.name)
                && (field.aliases.contains(&normalized.as_str())
                    || normalize_header(field.name) == normalized)
        });

        if let Some(field) = matched {
            settled_fields.insert(field.name);
            used_columns.insert(column);
            result.mapping.insert(field.name, header.clone());
            result.columns.insert(field.name, column);
        }
    }

    result.unmatched_headers = headers
        .iter()
        .enumerate()
        .filter(|(column, header)| !used_columns.contains(column) && !header.trim().is_empty())
        .map(|(_, header)| header.clone())
        .collect();

    result.missing_fields = kind
        .fields()
        .iter()
        .filter(|f| f.required && !result.columns.contains_key(f.name))
        .map(|f| f.name)
        .collect();

    Ok(result)
}

/// Exact header text first, then normalized comparison
fn find_column(headers: &[String], wanted: &str, used: &HashSet<usize>) -> Option<usize> {
    let free = |i: &usize| !used.contains(i);

    (0..headers.len())
        .filter(free)
        .find(|&i| headers[i] == wanted)
        .or_else(|| {
            let normalized = normalize_header(wanted);
            (0..headers.len())
                .filter(free)
                .find(|&i| normalize_header(&headers[i]) == normalized)
        })
}
