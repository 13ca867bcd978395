//! Interview-data CSV → `CandidateRecord`s.
//!
//! Canonical headers are snake_case (`candidate_name`, `job_title_applied_for`, ...).
//! `Name` and `Role` are accepted as aliases. Scores are integers in 0..=10;
//! nothing missing or non-numeric is ever coerced to a default.

use serde::Deserialize;

use crate::payload::error::ValidationError;
use crate::payload::models::CandidateRecord;

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCandidateRow {
    interview_id: Option<String>,
    #[serde(alias = "Name")]
    candidate_name: Option<String>,
    #[serde(alias = "Role")]
    job_title_applied_for: Option<String>,
    key_skills_mentioned: Option<String>,
    relevant_experience_years: Option<String>,
    additional_experience_shared: Option<String>,
    preparedness_score: Option<String>,
    values_alignment_score: Option<String>,
    language_proficiency_score: Option<String>,
    final_recommendation: Option<String>,
}

/// Parses every data row. Fails on the first invalid row, reporting its zero-based index.
pub fn parse_candidates(csv_text: &str) -> Result<Vec<CandidateRecord>, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    reader
        .deserialize::<RawCandidateRow>()
        .enumerate()
        .map(|(index, row)| {
            let row = row.map_err(|e| ValidationError::malformed(index, csv_reason(&e)))?;
            to_record(index, row)
        })
        .collect()
}

fn to_record(index: usize, row: RawCandidateRow) -> Result<CandidateRecord, ValidationError> {
    let field = |value: Option<String>, name: &str| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ValidationError::malformed(index, format!("missing field '{name}'")))
    };

    let interview_id = field(row.interview_id, "interview_id")?;
    let interview_id = interview_id.parse::<u64>().map_err(|_| {
        ValidationError::malformed(
            index,
            format!("interview_id must be a non-negative integer, got '{interview_id}'"),
        )
    })?;

    let years = field(row.relevant_experience_years, "relevant_experience_years")?;
    let years_experience = years.parse::<u32>().map_err(|_| {
        ValidationError::malformed(
            index,
            format!("relevant_experience_years must be a non-negative integer, got '{years}'"),
        )
    })?;

    Ok(CandidateRecord {
        interview_id,
        candidate_name: field(row.candidate_name, "candidate_name")?,
        job_title_applied: field(row.job_title_applied_for, "job_title_applied_for")?,
        key_skills: parse_skills(index, row.key_skills_mentioned.as_deref().unwrap_or(""))?,
        years_experience,
        additional_experience: row
            .additional_experience_shared
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
        preparedness_score: parse_score(
            index,
            "preparedness_score",
            &field(row.preparedness_score, "preparedness_score")?,
        )?,
        values_alignment_score: parse_score(
            index,
            "values_alignment_score",
            &field(row.values_alignment_score, "values_alignment_score")?,
        )?,
        language_proficiency_score: parse_score(
            index,
            "language_proficiency_score",
            &field(row.language_proficiency_score, "language_proficiency_score")?,
        )?,
        final_recommendation: parse_recommendation(
            index,
            &field(row.final_recommendation, "final_recommendation")?,
        )?,
    })
}

fn parse_score(index: usize, name: &str, raw: &str) -> Result<u8, ValidationError> {
    let value = raw.parse::<i64>().map_err(|_| {
        ValidationError::malformed(index, format!("{name} must be an integer, got '{raw}'"))
    })?;
    if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
        return Err(ValidationError::malformed(
            index,
            format!("{name} must be between {MIN_SCORE} and {MAX_SCORE}, got {value}"),
        ));
    }
    // Range-checked above.
    Ok(value as u8)
}

fn parse_recommendation(index: usize, raw: &str) -> Result<bool, ValidationError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "recommended" => Ok(true),
        "false" | "no" | "n" | "0" | "not recommended" => Ok(false),
        _ => Err(ValidationError::malformed(
            index,
            format!("final_recommendation must be true or false, got '{raw}'"),
        )),
    }
}

/// Comma-separated list, or a JSON array of strings.
fn parse_skills(index: usize, raw: &str) -> Result<Vec<String>, ValidationError> {
    let raw = raw.trim();
    let skills: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
            ValidationError::malformed(index, format!("key_skills_mentioned is not a valid JSON list: {e}"))
        })?
    } else {
        raw.split(',').map(str::to_string).collect()
    };
    Ok(skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn csv_reason(e: &csv::Error) -> String {
    match e.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {expected_len} columns, found {len}"),
        csv::ErrorKind::Utf8 { .. } => "row is not valid UTF-8".to_string(),
        _ => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "interview_id,candidate_name,job_title_applied_for,key_skills_mentioned,relevant_experience_years,additional_experience_shared,preparedness_score,values_alignment_score,language_proficiency_score,final_recommendation";

    fn csv(rows: &[&str]) -> String {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    fn expect_malformed(text: &str) -> (usize, String) {
        match parse_candidates(text).unwrap_err() {
            ValidationError::MalformedRecord {
                record_index,
                reason,
            } => (record_index, reason),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_parses_valid_row() {
        let text = csv(&[r#"1,Jane Doe,WordPress Developer,"PHP,WordPress",5,Built plugins,8,7,9,true"#]);
        let records = parse_candidates(&text).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.interview_id, 1);
        assert_eq!(r.candidate_name, "Jane Doe");
        assert_eq!(r.key_skills, vec!["PHP", "WordPress"]);
        assert_eq!(r.years_experience, 5);
        assert_eq!(r.preparedness_score, 8);
        assert_eq!(r.values_alignment_score, 7);
        assert_eq!(r.language_proficiency_score, 9);
        assert!(r.final_recommendation);
    }

    #[test]
    fn test_preserves_row_order() {
        let text = csv(&[
            "2,Zed,Dev,Rust,3,,5,5,5,false",
            "1,Amy,Dev,Go,4,,6,6,6,true",
        ]);
        let names: Vec<_> = parse_candidates(&text)
            .unwrap()
            .into_iter()
            .map(|r| r.candidate_name)
            .collect();
        assert_eq!(names, vec!["Zed", "Amy"]);
    }

    #[test]
    fn test_boundary_scores_accepted() {
        let text = csv(&["1,A,Dev,Rust,0,,0,10,0,no"]);
        let r = &parse_candidates(&text).unwrap()[0];
        assert_eq!(r.preparedness_score, 0);
        assert_eq!(r.values_alignment_score, 10);
        assert!(!r.final_recommendation);
    }

    #[test]
    fn test_score_above_range_is_malformed() {
        let (index, reason) = expect_malformed(&csv(&[
            "1,A,Dev,Rust,2,,5,5,5,true",
            "2,B,Dev,Rust,2,,11,5,5,true",
        ]));
        assert_eq!(index, 1);
        assert!(reason.contains("preparedness_score"));
    }

    #[test]
    fn test_negative_score_is_malformed() {
        let (_, reason) = expect_malformed(&csv(&["1,A,Dev,Rust,2,,5,-1,5,true"]));
        assert!(reason.contains("values_alignment_score"));
    }

    #[test]
    fn test_non_numeric_score_is_malformed() {
        let (index, reason) = expect_malformed(&csv(&["1,A,Dev,Rust,2,,5,5,high,true"]));
        assert_eq!(index, 0);
        assert!(reason.contains("language_proficiency_score"));
    }

    #[test]
    fn test_missing_score_is_not_zero() {
        let (_, reason) = expect_malformed(&csv(&["1,A,Dev,Rust,2,,,5,5,true"]));
        assert!(reason.contains("missing field 'preparedness_score'"));
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let text = "interview_id,candidate_name\n1,Jane";
        let (_, reason) = expect_malformed(text);
        assert!(reason.contains("missing field"));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let (index, reason) = expect_malformed(&csv(&["1,A,Dev,Rust,2,,5,5,5,true", "2,B"]));
        assert_eq!(index, 1);
        assert!(reason.contains("columns"));
    }

    #[test]
    fn test_bad_boolean_is_malformed() {
        let (_, reason) = expect_malformed(&csv(&["1,A,Dev,Rust,2,,5,5,5,maybe"]));
        assert!(reason.contains("final_recommendation"));
    }

    #[test]
    fn test_name_and_role_aliases() {
        let text = "interview_id,Name,Role,key_skills_mentioned,relevant_experience_years,additional_experience_shared,preparedness_score,values_alignment_score,language_proficiency_score,final_recommendation,Company\n\
                    7,JANE DOE,Engineer,Rust,6,,9,9,9,Recommended,Heidi";
        let r = &parse_candidates(text).unwrap()[0];
        assert_eq!(r.candidate_name, "JANE DOE");
        assert_eq!(r.job_title_applied, "Engineer");
        assert!(r.final_recommendation);
    }

    #[test]
    fn test_json_skill_list() {
        let text = csv(&[r#"1,A,Dev,"[""Rust"", ""Tokio""]",2,,5,5,5,true"#]);
        let r = &parse_candidates(&text).unwrap()[0];
        assert_eq!(r.key_skills, vec!["Rust", "Tokio"]);
    }

    #[test]
    fn test_invalid_json_skill_list_is_malformed() {
        let (_, reason) = expect_malformed(&csv(&[r#"1,A,Dev,"[Rust",2,,5,5,5,true"#]));
        assert!(reason.contains("key_skills_mentioned"));
    }

    #[test]
    fn test_header_only_yields_no_records() {
        assert!(parse_candidates(HEADER).unwrap().is_empty());
    }
}
