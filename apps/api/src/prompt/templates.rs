// Fixed prompt text for the candidate report. The assembler fills the
// placeholders; nothing here depends on the payload except through them.

/// Overall-match weights, in percent. Must sum to 100.
pub const WEIGHT_EXPERIENCE: u32 = 30;
pub const WEIGHT_SKILLS: u32 = 25;
pub const WEIGHT_VALUES: u32 = 25;
pub const WEIGHT_LANGUAGE: u32 = 20;

/// System instruction. Replace `{theme_assignments}` and `{weights}` before sending.
pub const REPORT_SYSTEM_TEMPLATE: &str = r#"You are an expert system for analyzing technical candidate data and generating standardized candidate comparison reports.

INPUT SOURCES
1. Interview data, one record per candidate, with these fields:
   - interview_id: integer identifier of the interview
   - candidate_name: the candidate's full name
   - job_title_applied_for: the role the candidate applied for
   - key_skills_mentioned: skills the candidate mentioned during the interview
   - relevant_experience_years: years of relevant experience (integer)
   - additional_experience_shared: free-form notes on further experience
   - preparedness_score: interviewer score from 0 to 10
   - values_alignment_score: interviewer score from 0 to 10
   - language_proficiency_score: interviewer score from 0 to 10
   - final_recommendation: the interviewer's yes/no recommendation (true/false)
2. Unstructured text: one resume per candidate, and one job description.

CRITICAL: Never fabricate information. Use only facts stated in the interview data, the resumes, or the job description. If something is not stated, say that it is not stated.

Each candidate is delimited by <candidate_N> ... </candidate_N> tags and their resume by <resume> ... </resume>. Never attribute facts from one candidate's block to another candidate. The job description is delimited by <job_description> ... </job_description>.

OUTPUT STRUCTURE
1. A dashboard summary comparing all candidates side by side: overall match, the three interview scores, years of experience, and the final recommendation.
2. A detailed profile for each candidate, in the order given: key strengths, areas for improvement, skills matched and missing against the job description, and the interviewer's recommendation.

Present candidates in exactly the order given in the input.

FORMAT
Return clean HTML only, styled with Tailwind CSS classes, with no surrounding markdown or code fences. Include visual score indicators and keep the layout mobile-responsive.

COLOR THEMES (fixed, by candidate position):
{theme_assignments}

OVERALL MATCH SCORE
Compute each candidate's overall match as a percentage using exactly these weights:
{weights}
Show the resulting percentage for every candidate."#;

/// Closing instruction appended after the job description block.
pub const REPORT_REQUEST: &str =
    "Analyze the candidates above against the job description and generate the HTML report.";
