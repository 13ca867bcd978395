use serde::Serialize;
use thiserror::Error;

use crate::uploads::models::FileRole;

/// Local, pre-network failure. Always recoverable by re-selecting files.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{}", missing_role_message(.role))]
    MissingRole { role: FileRole },

    #[error("'{file_name}' has not been extracted ({detail})")]
    ExtractionIncomplete { file_name: String, detail: String },

    #[error("'{file_name}' contains no text")]
    EmptyContent { file_name: String },

    #[error("Interview record {} is invalid: {reason}", .record_index + 1)]
    MalformedRecord { record_index: usize, reason: String },

    #[error("Interview record {} duplicates an earlier candidate: {reason}", .record_index + 1)]
    DuplicateCandidate { record_index: usize, reason: String },

    #[error("{reason}")]
    UnmatchedResume { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    MissingRole,
    ExtractionIncomplete,
    EmptyContent,
    MalformedRecord,
    DuplicateCandidate,
    UnmatchedResume,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::MissingRole { .. } => ValidationErrorKind::MissingRole,
            ValidationError::ExtractionIncomplete { .. } => ValidationErrorKind::ExtractionIncomplete,
            ValidationError::EmptyContent { .. } => ValidationErrorKind::EmptyContent,
            ValidationError::MalformedRecord { .. } => ValidationErrorKind::MalformedRecord,
            ValidationError::DuplicateCandidate { .. } => ValidationErrorKind::DuplicateCandidate,
            ValidationError::UnmatchedResume { .. } => ValidationErrorKind::UnmatchedResume,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ValidationErrorKind::MissingRole => "MISSING_ROLE",
            ValidationErrorKind::ExtractionIncomplete => "EXTRACTION_INCOMPLETE",
            ValidationErrorKind::EmptyContent => "EMPTY_CONTENT",
            ValidationErrorKind::MalformedRecord => "MALFORMED_RECORD",
            ValidationErrorKind::DuplicateCandidate => "DUPLICATE_CANDIDATE",
            ValidationErrorKind::UnmatchedResume => "UNMATCHED_RESUME",
        }
    }

    pub(crate) fn malformed(record_index: usize, reason: impl Into<String>) -> Self {
        ValidationError::MalformedRecord {
            record_index,
            reason: reason.into(),
        }
    }
}

fn missing_role_message(role: &FileRole) -> &'static str {
    match role {
        FileRole::InterviewData => "Please upload the interview data CSV",
        FileRole::JobDescription => "Please upload a job description",
        FileRole::Resume => "Please upload at least one candidate resume",
    }
}
