// Job descriptions: the category tag store, model-driven tag extraction, and the
// endpoints that maintain both.

pub mod extract;
pub mod handlers;
pub mod prompts;
pub mod tags;
