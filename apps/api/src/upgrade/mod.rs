// Prompt upgrading: parameter model, instruction compiler, analysis
// normalization, templates, keyword detection and per-user history.
// All provider calls go through llm_client via the TextCompleter seam.

pub mod analysis;
pub mod compiler;
pub mod detection;
pub mod handlers;
pub mod history;
pub mod parameters;
pub mod prompts;
pub mod service;
pub mod templates;
