//! Error types for the timetable extraction pipeline.

use thiserror::Error;

/// Errors that can occur while extracting a timetable.
///
/// Every variant is fatal for the group being extracted; nothing in the
/// pipeline retries or emits a partial calendar.
#[derive(Debug, Error, Clone)]
pub enum ChronosError {
    /// Network/HTTP request failed before a response was received
    #[error("Network error: {message}")]
    Network { message: String },

    /// The remote application answered with a non-success status
    #[error("Request to {url} failed with status {status}")]
    Transport { url: String, status: u16 },

    /// The root page did not reference the tree frame
    #[error("Could not find the tree frame on {url}")]
    TreeFrameMissing { url: String },

    /// No link on the tree page carried the requested selector
    #[error("Cannot resolve calendar for this path: no link for segment {segment} at depth {depth}")]
    Unresolvable { segment: String, depth: usize },

    /// The path ended on an empty selector
    #[error("Cannot resolve calendar for this path: empty terminal selector")]
    EmptySelector,

    /// The week picker has no week with the requested date label
    #[error("No week labelled {label:?} in the week picker")]
    WeekLabelNotFound { label: String },

    /// The requested group is not in the path table
    #[error("Can't find path for this calendar: {group}")]
    UnknownGroup { group: String },

    /// Configuration could not be loaded or decoded
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The duration field matched none of the known shapes
    #[error("Unhandled duration format: {raw:?}")]
    UnhandledDuration { raw: String },

    /// A schedule row did not have the expected shape
    #[error("Unexpected schedule row with {fields} fields")]
    UnexpectedRow { fields: usize },

    /// Failed to parse a value scraped from a page
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },

    /// Reading or writing a local file failed
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl ChronosError {
    /// Returns true if the error came from talking to the remote application.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ChronosError::Network { .. } | ChronosError::Transport { .. }
        )
    }

    /// Returns true if the error is detectable without any network activity.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ChronosError::UnknownGroup { .. }
                | ChronosError::Config { .. }
                | ChronosError::EmptySelector
        )
    }
}

impl From<reqwest::Error> for ChronosError {
    fn from(err: reqwest::Error) -> Self {
        ChronosError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ChronosError {
    fn from(err: url::ParseError) -> Self {
        ChronosError::UrlError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ChronosError {
    fn from(err: std::io::Error) -> Self {
        ChronosError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChronosError {
    fn from(err: serde_json::Error) -> Self {
        ChronosError::Config {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChronosError>;
