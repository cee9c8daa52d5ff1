//! Root-relative logical paths: ordered sequences of [`Name`]s.

use std::fmt;

use thiserror::Error;

use super::name::{InvalidNameError, Name};

/// A textual path failed validation. Raised before any I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPathError {
    /// A segment failed [`Name::parse`].
    #[error("invalid segment in {path:?}: {source}")]
    Segment {
        path: String,
        source: InvalidNameError,
    },

    /// A `..` had no preceding segment to remove. With no defined current
    /// directory there is nothing sensible to resolve it against.
    #[error("{path:?} escapes the repository root")]
    EscapesRoot { path: String },
}

/// An ordered sequence of names, relative to the repository root.
///
/// The empty path is the root itself. Values are immutable; `down` and
/// `parent` return new paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemPath {
    segments: Vec<Name>,
}

impl ItemPath {
    /// The repository root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path.
    ///
    /// Empty segments and `.` are dropped. A `..` removes the segment before
    /// it; a `..` with nothing left to remove is an error rather than a guess
    /// at an implicit base.
    pub fn parse(text: &str) -> Result<Self, InvalidPathError> {
        let mut segments = Vec::new();
        for part in text.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(InvalidPathError::EscapesRoot {
                            path: text.to_string(),
                        });
                    }
                }
                segment => {
                    segments.push(Name::parse(segment).map_err(|source| {
                        InvalidPathError::Segment {
                            path: text.to_string(),
                            source,
                        }
                    })?);
                }
            }
        }
        Ok(Self { segments })
    }

    /// Whether this is the repository root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The final segment, if any.
    pub fn name(&self) -> Option<&Name> {
        self.segments.last()
    }

    /// The path one level down: this path with `name` appended.
    pub fn down(&self, name: Name) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name);
        Self { segments }
    }

    /// The containing path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// The segments in root-to-leaf order.
    pub fn segments(&self) -> &[Name] {
        &self.segments
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                f.write_str("/")?;
            }
            first = false;
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
