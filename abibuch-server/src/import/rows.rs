//! CSV parsing and row validation

use std::collections::BTreeMap;

use abibuch_common::models::Gender;
use serde::{Deserialize, Serialize};

use super::{HeaderMatch, ImportError, ImportKind, MAX_VALUE_LENGTH};

/// Raw CSV contents
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub delimiter: u8,
    pub headers: Vec<String>,
    /// Line number (1-based, header is line 1) and fields of each data record
    pub records: Vec<(usize, Vec<String>)>,
}

/// One data row mapped to import fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub line: usize,
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ImportRow {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.values
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Pick the delimiter from the header line
///
/// Semicolon exports (German Excel) are the common case; tab wins only when
/// it outnumbers both others. Ties fall back to comma.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let count = |c: char| header_line.matches(c).count();
    let (semicolons, commas, tabs) = (count(';'), count(','), count('\t'));

    if tabs > semicolons && tabs > commas {
        b'\t'
    } else if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Parse CSV text
///
/// Strips a UTF-8 BOM, accepts rows of varying length and skips rows whose
/// fields are all blank.
pub fn parse_csv(text: &str) -> Result<ParsedCsv, ImportError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let header_line = text.lines().find(|l| !l.trim().is_empty()).ok_or(ImportError::Empty)?;
    let delimiter = detect_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportError::Empty);
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|p| line_of_byte(text, p.byte() as usize))
            .unwrap_or(0);
        records.push((line, record.iter().map(str::to_string).collect()));
    }

    Ok(ParsedCsv {
        delimiter,
        headers,
        records,
    })
}

/// 1-based line number containing byte offset `byte`
fn line_of_byte(text: &str, byte: usize) -> usize {
    let end = byte.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

/// Map parsed records to import rows using `matched` columns
pub fn map_rows(kind: ImportKind, parsed: &ParsedCsv, matched: &HeaderMatch) -> Vec<ImportRow> {
    parsed
        .records
        .iter()
        .map(|(line, fields)| {
            let values: BTreeMap<String, String> = matched
                .columns
                .iter()
                .map(|(field, column)| {
                    let value = fields.get(*column).map(|v| v.trim()).unwrap_or("");
                    (field.to_string(), value.to_string())
                })
                .collect();

            let errors = validate_values(kind, &values);
            ImportRow {
                line: *line,
                values,
                errors,
            }
        })
        .collect()
}

/// Validation messages for one row's values (empty when valid)
pub fn validate_values(kind: ImportKind, values: &BTreeMap<String, String>) -> Vec<String> {
    let mut errors = Vec::new();

    for name in values.keys() {
        if kind.field(name).is_none() {
            errors.push(format!("Unknown field '{}'", name));
        }
    }

    for field in kind.fields() {
        let value = values.get(field.name).map(|v| v.trim()).unwrap_or("");

        if value.is_empty() {
            if field.required {
                errors.push(format!("{} is required", field.name));
            }
            continue;
        }

        if value.chars().count() > MAX_VALUE_LENGTH {
            errors.push(format!(
                "{} is longer than {} characters",
                field.name, MAX_VALUE_LENGTH
            ));
        }

        match field.name {
            "gender" if Gender::from_input(value).is_none() => {
                errors.push(format!("Unknown gender '{}'", value));
            }
            "email" if !value.contains('@') => {
                errors.push(format!("Invalid email '{}'", value));
            }
            _ => {}
        }
    }

    errors
}

/// Key used to detect duplicate people: case-insensitive, whitespace-collapsed
/// first and last name
pub fn duplicate_key(first_name: Option<&str>, last_name: &str) -> String {
    let collapse = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    format!("{}|{}", collapse(first_name.unwrap_or("")), collapse(last_name))
}
