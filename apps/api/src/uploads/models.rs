use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an uploaded file is for. Drives extraction and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileRole {
    InterviewData,
    JobDescription,
    Resume,
}

impl FileRole {
    /// Singleton roles hold at most one file; a new upload replaces the old one.
    pub fn is_singleton(self) -> bool {
        !matches!(self, FileRole::Resume)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileRole::InterviewData => "interview-data",
            FileRole::JobDescription => "job-description",
            FileRole::Resume => "resume",
        }
    }
}

impl std::str::FromStr for FileRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interview-data" => Ok(FileRole::InterviewData),
            "job-description" => Ok(FileRole::JobDescription),
            "resume" => Ok(FileRole::Resume),
            other => Err(format!(
                "Unknown file role '{other}' (expected interview-data, job-description or resume)"
            )),
        }
    }
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Pending,
    Extracting,
    Extracted { text: String },
    Failed { detail: String },
}

impl FileStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, FileStatus::Extracted { .. } | FileStatus::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Extracting => "extracting",
            FileStatus::Extracted { .. } => "extracted",
            FileStatus::Failed { .. } => "failed",
        }
    }
}

/// A file selected by the user. Raw bytes are dropped once extraction settles.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub id: Uuid,
    pub role: FileRole,
    pub file_name: String,
    pub size_bytes: usize,
    pub status: FileStatus,
    pub(crate) raw: Option<Bytes>,
}

impl UploadedFile {
    pub fn new(role: FileRole, file_name: impl Into<String>, raw: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            file_name: file_name.into(),
            size_bytes: raw.len(),
            status: FileStatus::Pending,
            raw: Some(raw),
        }
    }

    pub fn extracted_text(&self) -> Option<&str> {
        match &self.status {
            FileStatus::Extracted { text } => Some(text),
            _ => None,
        }
    }
}

/// A file as handed over by the caller, before registration.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content: Bytes,
}

impl IncomingFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// Per-file status view returned to pollers.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub index: usize,
    pub id: Uuid,
    pub role: FileRole,
    pub file_name: String,
    pub size_bytes: usize,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileSummary {
    pub fn from_file(index: usize, file: &UploadedFile) -> Self {
        let error = match &file.status {
            FileStatus::Failed { detail } => Some(detail.clone()),
            _ => None,
        };
        Self {
            index,
            id: file.id,
            role: file.role,
            file_name: file.file_name.clone(),
            size_bytes: file.size_bytes,
            status: file.status.label(),
            extracted_chars: file.extracted_text().map(|t| t.chars().count()),
            error,
        }
    }
}
