//! Text extraction: uploaded bytes to plain text.
//!
//! PDFs go through `pdf-extract`; every whitespace run (page breaks included)
//! collapses to a single space. Plain-text documents are accepted as UTF-8.
//! Interview data is kept verbatim because its line structure is the CSV.

use thiserror::Error;

use crate::uploads::models::FileRole;

const PDF_MAGIC: &[u8] = b"%PDF";
const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to extract text from PDF '{file_name}': {message}")]
    Pdf { file_name: String, message: String },

    #[error("'{file_name}' is neither a PDF nor UTF-8 text")]
    NotText { file_name: String },

    #[error("Extractor stopped unexpectedly while processing '{file_name}'")]
    Aborted { file_name: String },
}

/// Blocking text extraction. Called from the blocking pool, never on a runtime worker.
pub trait TextExtractor: Send + Sync + 'static {
    fn extract(
        &self,
        role: FileRole,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, ExtractionError>;
}

/// Default extractor backed by `pdf-extract`.
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(
        &self,
        role: FileRole,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, ExtractionError> {
        match role {
            FileRole::InterviewData => decode_utf8(file_name, bytes),
            FileRole::JobDescription | FileRole::Resume => {
                if is_pdf(bytes) {
                    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                        ExtractionError::Pdf {
                            file_name: file_name.to_string(),
                            message: e.to_string(),
                        }
                    })?;
                    Ok(normalize_whitespace(&text))
                } else {
                    decode_utf8(file_name, bytes).map(|text| normalize_whitespace(&text))
                }
            }
        }
    }
}

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Collapses every run of whitespace into one space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_utf8(file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ExtractionError::NotText {
        file_name: file_name.to_string(),
    })?;
    Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace_collapses_page_breaks() {
        let text = "Jane Doe\n\n\x0cPage 2\t  WordPress \r\n";
        assert_eq!(normalize_whitespace(text), "Jane Doe Page 2 WordPress");
    }

    #[test]
    fn test_normalize_whitespace_empty() {
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_is_pdf_detects_magic() {
        assert!(is_pdf(b"%PDF-1.7\n..."));
        assert!(!is_pdf(b"interview_id,candidate_name"));
    }

    #[test]
    fn test_interview_data_keeps_line_structure() {
        let csv = "interview_id,candidate_name\n1,Jane Doe\n";
        let text = DocumentExtractor
            .extract(FileRole::InterviewData, "scores.csv", csv.as_bytes())
            .unwrap();
        assert_eq!(text, csv);
    }

    #[test]
    fn test_interview_data_strips_bom() {
        let csv = "\u{feff}interview_id\n1\n";
        let text = DocumentExtractor
            .extract(FileRole::InterviewData, "scores.csv", csv.as_bytes())
            .unwrap();
        assert_eq!(text, "interview_id\n1\n");
    }

    #[test]
    fn test_plain_text_resume_is_normalized() {
        let text = DocumentExtractor
            .extract(FileRole::Resume, "Jane Doe.txt", b"Jane Doe,\n\n 5 years WordPress")
            .unwrap();
        assert_eq!(text, "Jane Doe, 5 years WordPress");
    }

    #[test]
    fn test_binary_non_pdf_is_rejected() {
        let err = DocumentExtractor
            .extract(FileRole::JobDescription, "jd.bin", &[0xff, 0xfe, 0x00, 0x81])
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NotText { .. }));
    }
}
