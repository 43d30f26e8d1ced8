// Prompt constants for the relevance classifier's scored tier.
// Reuses the JSON-only system prompt from llm_client::prompts.

/// System prompt for relevance ranking: extends the shared JSON-only rule.
pub const RELEVANCE_SYSTEM: &str = "You are an experienced technical recruiter. \
    You judge which job listings fit a candidate. \
    You MUST respond with a JSON array of integers only.";

/// Relevance prompt. Every `{placeholder}` is filled in one pass before sending.
pub const RELEVANCE_PROMPT_TEMPLATE: &str = r#"Select the job listings that are relevant for this candidate.

CANDIDATE:
- Position: {position}
- Experience: {experience}
- Skills: {skills}
- Expected salary: {salary}
- Job nature: {job_nature}
- Location: {location}

JOB LISTINGS ({count} total, numbered from 1):
{listings}

Rules:
- Judge relevance by role, required skills, seniority, location and job nature.
- Select AT LEAST {min_count} listings; choose the closest matches if few fit well.
- Use only the numbers shown above (1 to {count}).

Return ONLY a JSON array of the selected listing numbers, for example: [1, 4, 7]"#;
