//! Payload Validator: turns a settled file set into an `AnalysisPayload`.
//!
//! Résumés are joined to candidates by name: the résumé's file stem must equal
//! the CSV `candidate_name` after normalization (case, `_`/`-`, whitespace).
//! Anything that does not join cleanly is rejected rather than dropped.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::extraction::normalize_whitespace;
use crate::payload::error::ValidationError;
use crate::payload::models::{AnalysisPayload, CandidateRecord};
use crate::payload::records::parse_candidates;
use crate::uploads::models::{FileRole, FileStatus, UploadedFile};

pub fn validate(files: &[UploadedFile]) -> Result<AnalysisPayload, ValidationError> {
    let interview = first_of(files, FileRole::InterviewData)?;
    let job_description = first_of(files, FileRole::JobDescription)?;
    let resumes: Vec<&UploadedFile> = files.iter().filter(|f| f.role == FileRole::Resume).collect();
    if resumes.is_empty() {
        return Err(ValidationError::MissingRole {
            role: FileRole::Resume,
        });
    }

    let required: Vec<&UploadedFile> = [interview, job_description]
        .into_iter()
        .chain(resumes.iter().copied())
        .collect();
    let texts = required
        .iter()
        .map(|&f| settled_text(f))
        .collect::<Result<Vec<_>, _>>()?;

    for (file, text) in required.iter().zip(&texts) {
        if normalize_whitespace(text).is_empty() {
            return Err(ValidationError::EmptyContent {
                file_name: file.file_name.clone(),
            });
        }
    }

    let candidates = parse_candidates(texts[0])?;
    if candidates.is_empty() {
        return Err(ValidationError::EmptyContent {
            file_name: interview.file_name.clone(),
        });
    }
    check_duplicates(&candidates)?;

    let resume_texts = join_resumes(&candidates, &resumes, &texts[2..])?;
    debug!(
        "Validated payload: {} candidates, job description {} chars",
        candidates.len(),
        texts[1].len()
    );

    Ok(AnalysisPayload {
        candidates,
        job_description_text: texts[1].to_string(),
        resume_texts,
    })
}

/// Normalized join key for candidate names and résumé file stems.
pub fn name_key(name: &str) -> String {
    name.replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn first_of(files: &[UploadedFile], role: FileRole) -> Result<&UploadedFile, ValidationError> {
    files
        .iter()
        .find(|f| f.role == role)
        .ok_or(ValidationError::MissingRole { role })
}

fn settled_text(file: &UploadedFile) -> Result<&str, ValidationError> {
    let detail = match &file.status {
        FileStatus::Extracted { text } => return Ok(text.as_str()),
        FileStatus::Pending => "waiting for extraction".to_string(),
        FileStatus::Extracting => "extraction in progress".to_string(),
        FileStatus::Failed { detail } => detail.clone(),
    };
    Err(ValidationError::ExtractionIncomplete {
        file_name: file.file_name.clone(),
        detail,
    })
}

fn check_duplicates(candidates: &[CandidateRecord]) -> Result<(), ValidationError> {
    let mut ids = HashMap::new();
    let mut names = HashMap::new();
    for (index, c) in candidates.iter().enumerate() {
        if let Some(first) = ids.insert(c.interview_id, index) {
            return Err(ValidationError::DuplicateCandidate {
                record_index: index,
                reason: format!(
                    "interview_id {} already used by record {}",
                    c.interview_id,
                    first + 1
                ),
            });
        }
        if let Some(first) = names.insert(name_key(&c.candidate_name), index) {
            return Err(ValidationError::DuplicateCandidate {
                record_index: index,
                reason: format!(
                    "candidate '{}' already listed in record {}",
                    c.candidate_name,
                    first + 1
                ),
            });
        }
    }
    Ok(())
}

fn join_resumes(
    candidates: &[CandidateRecord],
    resumes: &[&UploadedFile],
    texts: &[&str],
) -> Result<Vec<String>, ValidationError> {
    let by_name: HashMap<String, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (name_key(&c.candidate_name), i))
        .collect();

    let mut joined: Vec<Option<(&str, &str)>> = vec![None; candidates.len()];
    for (file, &text) in resumes.iter().zip(texts) {
        let stem = Path::new(&file.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&file.file_name);
        let Some(&index) = by_name.get(&name_key(stem)) else {
            return Err(ValidationError::UnmatchedResume {
                reason: format!(
                    "Resume '{}' does not match any candidate_name in the interview data",
                    file.file_name
                ),
            });
        };
        if let Some((previous, _)) = joined[index] {
            return Err(ValidationError::UnmatchedResume {
                reason: format!(
                    "Resumes '{}' and '{}' both match candidate '{}'",
                    previous, file.file_name, candidates[index].candidate_name
                ),
            });
        }
        joined[index] = Some((file.file_name.as_str(), text));
    }

    candidates
        .iter()
        .zip(joined)
        .map(|(c, slot)| {
            slot.map(|(_, text)| text.to_string())
                .ok_or_else(|| ValidationError::UnmatchedResume {
                    reason: format!(
                        "No resume uploaded for candidate '{}' (expected a file named '{}.pdf')",
                        c.candidate_name, c.candidate_name
                    ),
                })
        })
        .collect()
}
