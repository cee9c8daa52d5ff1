//! Validated single path segment with case-insensitive identity.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

/// A candidate segment failed validation. Raised before any I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    #[error("name is empty")]
    Empty,

    #[error("'{name}' is reserved and cannot name an entry")]
    Reserved { name: String },

    #[error("name {name:?} contains {character:?}, which is illegal in a filesystem entry")]
    IllegalCharacter { name: String, character: char },
}

/// Characters that can never appear in an entry name on this platform.
#[cfg(windows)]
fn is_illegal(c: char) -> bool {
    matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*') || (c as u32) < 0x20
}

#[cfg(not(windows))]
fn is_illegal(c: char) -> bool {
    matches!(c, '/' | '\0')
}

/// A single logical path segment.
///
/// Equality, ordering, and hashing are case-insensitive: `Secrets` and
/// `secrets` are the same logical entry. The original spelling is preserved
/// for display and for the on-disk form.
#[derive(Debug, Clone)]
pub struct Name {
    raw: String,
    /// Case-folded spelling; the unit of identity.
    folded: String,
}

impl Name {
    /// Validate `text` as a path segment.
    pub fn parse(text: &str) -> Result<Self, InvalidNameError> {
        if text.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if text == "." || text == ".." {
            return Err(InvalidNameError::Reserved {
                name: text.to_string(),
            });
        }
        if let Some(character) = text.chars().find(|&c| is_illegal(c)) {
            return Err(InvalidNameError::IllegalCharacter {
                name: text.to_string(),
                character,
            });
        }
        Ok(Self {
            raw: text.to_string(),
            folded: text.to_lowercase(),
        })
    }

    /// The original spelling.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this name is hidden under default listing options.
    pub fn is_dotted(&self) -> bool {
        self.raw.starts_with('.') || self.raw.starts_with('_')
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}
