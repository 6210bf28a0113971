//! Person name and role extraction from uploaded photo filenames
//!
//! Recognised shapes:
//! - `John Doe - Software Engineer.jpg` → ("John Doe", "Software Engineer")
//! - `Jane_Smith_Marketing_Manager.png` → ("Jane Smith", "Marketing Manager")
//! - `Bob_Wilson_Sales.jpg` → ("Bob Wilson", "Sales")
//! - `Sarah_Davis.png` → ("Sarah", "Davis")
//! - `Mike Thompson.jpg` → ("Mike Thompson", "Team Member")
//!
//! Underscore names treat the last segment as the role when there are three
//! segments, but the last two when there are four or more. Uploads in the
//! wild rely on both, so the split is kept as is.

use thiserror::Error;

/// Role assigned when the filename carries none
pub const DEFAULT_ROLE: &str = "Team Member";

const ROLE_DELIMITER: &str = " - ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilenameParseError {
    #[error("Could not parse name from filename: {0}")]
    EmptyName(String),
}

/// Name and role recovered from a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub person_name: String,
    pub person_role: String,
}

/// Remove everything after the last `.`, if any
pub fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) => &filename[..idx],
        None => filename,
    }
}

/// Parse a filename (extension included) into a person name and role
pub fn parse_filename(filename: &str) -> Result<ParsedName, FilenameParseError> {
    let stem = strip_extension(filename);

    let (person_name, person_role) = if let Some((name, role)) = stem.split_once(ROLE_DELIMITER) {
        let role = role.trim();
        let role = if role.is_empty() { DEFAULT_ROLE } else { role };
        (name.trim().to_string(), role.to_string())
    } else if stem.contains('_') {
        split_underscored(stem)
    } else {
        (stem.trim().to_string(), DEFAULT_ROLE.to_string())
    };

    if person_name.is_empty() {
        return Err(FilenameParseError::EmptyName(filename.to_string()));
    }

    Ok(ParsedName {
        person_name,
        person_role,
    })
}

fn split_underscored(stem: &str) -> (String, String) {
    let parts: Vec<&str> = stem.split('_').collect();

    // `contains('_')` guarantees at least two segments
    let role_segments = match parts.len() {
        2 | 3 => 1,
        _ => 2,
    };
    let split = parts.len() - role_segments;

    (
        parts[..split].join(" ").trim().to_string(),
        parts[split..].join(" ").trim().to_string(),
    )
}
