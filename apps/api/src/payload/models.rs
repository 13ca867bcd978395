use serde::Serialize;

/// One row of the interview-data CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub interview_id: u64,
    pub candidate_name: String,
    pub job_title_applied: String,
    pub key_skills: Vec<String>,
    pub years_experience: u32,
    pub additional_experience: String,
    /// 0 – 10
    pub preparedness_score: u8,
    /// 0 – 10
    pub values_alignment_score: u8,
    /// 0 – 10
    pub language_proficiency_score: u8,
    pub final_recommendation: bool,
}

/// Validated input for the prompt assembler.
///
/// `resume_texts[i]` belongs to `candidates[i]`; order is the CSV row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPayload {
    pub candidates: Vec<CandidateRecord>,
    pub job_description_text: String,
    pub resume_texts: Vec<String>,
}
