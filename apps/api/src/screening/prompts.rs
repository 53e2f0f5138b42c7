// Prompt constants for the fitness screen and its summarization passes.

/// Role for the fitness assessment; combined with `llm_client::prompts::json_system`.
pub const ASSESSMENT_ROLE: &str = "You are part of a resume screener. \
    Based on the job requirements and the resume provided, determine if the candidate is fit for the job. \
    Furthermore, from the list of job categories, list every category the candidate is ineligible for \
    on the basis of the job description, with a short reason for each. \
    Return an object of the form {\"is_fit\": true|false, \"reasoning\": {\"<category>\": \"<reason>\"}}.";

/// Assessment payload. Replace `{requirements}`, `{categories}` and `{resume}` before sending.
pub const ASSESSMENT_PROMPT_TEMPLATE: &str = "Job requirements: {requirements}.
Job Categories: {categories}.
Resume: {resume}.
";

/// System prompt for one summarization block.
pub const SUMMARIZE_SYSTEM: &str = "Summarize the following text. \
    Extract all key information while keeping the summary concise. \
    Respond with the summary only.";

pub fn assessment_prompt(requirements: &str, categories: &str, resume: &str) -> String {
    ASSESSMENT_PROMPT_TEMPLATE
        .replace("{requirements}", requirements)
        .replace("{categories}", categories)
        .replace("{resume}", resume)
}
