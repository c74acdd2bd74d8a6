//! Types for timetable extraction.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::error::ChronosError;

/// Professor value the remote application uses when nobody is assigned.
pub const NO_PROFESSOR: &str = "-";

/// One step of a route through the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A category, written `'name'` in the tree page links
    Category(String),
    /// A branch, written as a bare number in the tree page links
    Branch(String),
    /// Switches the terminal lookup to branch addressing
    BranchModeSwitch,
}

impl PathSegment {
    /// The selector argument as it appears inside a tree link.
    pub fn selector(&self) -> String {
        match self {
            PathSegment::Category(id) => format!("'{id}'"),
            PathSegment::Branch(id) => id.clone(),
            PathSegment::BranchModeSwitch => "'branch'".to_string(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.selector())
    }
}

/// A segment as written in the configuration file: a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSegment {
    Number(u64),
    Text(String),
}

impl TryFrom<&RawSegment> for PathSegment {
    type Error = ChronosError;

    fn try_from(raw: &RawSegment) -> Result<Self, Self::Error> {
        match raw {
            RawSegment::Number(n) => Ok(PathSegment::Branch(n.to_string())),
            RawSegment::Text(text) => {
                let text = text.trim();
                if text == "'branch'" {
                    return Ok(PathSegment::BranchModeSwitch);
                }
                if let Some(inner) = text
                    .strip_prefix('\'')
                    .and_then(|rest| rest.strip_suffix('\''))
                {
                    return Ok(PathSegment::Category(inner.to_string()));
                }
                if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                    return Ok(PathSegment::Branch(text.to_string()));
                }
                Err(ChronosError::Config {
                    message: format!("invalid path segment {text:?}"),
                })
            }
        }
    }
}

/// The route through the navigation tree to one timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPath {
    segments: Vec<PathSegment>,
}

impl GroupPath {
    /// Builds a path, rejecting shapes the navigator can never resolve.
    pub fn new(segments: Vec<PathSegment>) -> Result<Self, ChronosError> {
        match segments.last() {
            None => Err(ChronosError::Config {
                message: "empty group path".to_string(),
            }),
            Some(PathSegment::BranchModeSwitch) => Err(ChronosError::Config {
                message: "group path ends with the branch mode marker".to_string(),
            }),
            Some(_) => Ok(Self { segments }),
        }
    }

    /// Decodes a path from its configuration form.
    pub fn from_raw(raw: &[RawSegment]) -> Result<Self, ChronosError> {
        let segments = raw
            .iter()
            .map(PathSegment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Start of the remote week numbering, as a week-selector value.
///
/// Zero means week indices are used directly. Anchored values can be
/// epoch-sized, hence 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeekOrigin(pub u64);

impl WeekOrigin {
    pub const UNANCHORED: WeekOrigin = WeekOrigin(0);

    /// Week-selector value for the `offset`-th week after the origin.
    pub fn week(&self, offset: u32) -> Result<u64, ChronosError> {
        self.0
            .checked_add(u64::from(offset))
            .ok_or_else(|| ChronosError::Config {
                message: format!("week {offset} past origin {} overflows", self.0),
            })
    }
}

/// How a tree link navigates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    OpenCategory,
    OpenBranch,
    /// Any other script call (selection checkboxes, folding, ...)
    Other(String),
}

/// A navigation anchor scraped from a tree page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLink {
    pub kind: LinkKind,
    /// The first script argument, verbatim (quotes included)
    pub selector: String,
}

/// The seven text cells of one schedule table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub start_date: String,
    pub start_time: String,
    pub duration: String,
    pub class_code: String,
    pub groups: String,
    pub professor: String,
    pub room: String,
}

impl TryFrom<Vec<String>> for RawRow {
    type Error = ChronosError;

    fn try_from(cells: Vec<String>) -> Result<Self, Self::Error> {
        if cells.len() < 7 {
            return Err(ChronosError::UnexpectedRow {
                fields: cells.len(),
            });
        }
        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();
        Ok(RawRow {
            start_date: next(),
            start_time: next(),
            duration: next(),
            class_code: next(),
            groups: next(),
            professor: next(),
            room: next(),
        })
    }
}

/// One scheduled class occurrence, with names and room resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEvent {
    /// Wall-clock start in the timetable's civil timezone
    pub start: NaiveDateTime,
    /// Always after `start`
    pub end: NaiveDateTime,
    pub groups: BTreeSet<String>,
    /// `-` when unspecified
    pub professor: String,
    pub name: String,
    pub room: String,
}

impl ClassEvent {
    pub fn has_professor(&self) -> bool {
        self.professor != NO_PROFESSOR
    }
}
