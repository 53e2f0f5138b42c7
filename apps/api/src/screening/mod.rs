// Optional LLM fitness screen run before scoring.
// `summarize` keeps the assessment prompt under the model's comfortable input size.

pub mod fitness;
pub mod prompts;
pub mod summarize;
