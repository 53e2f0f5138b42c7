/// Role for job-description tag extraction; combined with `llm_client::prompts::json_system`.
pub const TAG_EXTRACTION_ROLE: &str = "You are part of an NLP resume screener. Divide your task into two. \
    First, extract keywords from the job description and categorize them as \
    education, work_experience, skills, certifications, projects and additional_info. \
    STRICTLY ensure that every keyword is at most TWO words. Avoid phrases and stopwords; keep it concise. \
    For example, instead of 'excellent troubleshooting skills', use 'troubleshooting'. \
    Split compound keywords ONLY where necessary, e.g. 'html5/css3/javascript' becomes 'html5', 'css3', 'javascript'. \
    Second, list the strict requirements for the job, including minimum experience, under job_requirements. \
    Leave a list empty if no data is available. \
    Return an object with exactly these keys, each holding a list of strings: \
    education, work_experience, skills, certifications, projects, additional_info, job_requirements.";

pub const TAG_EXTRACTION_PROMPT_TEMPLATE: &str = "Job description: {jd_text}";
