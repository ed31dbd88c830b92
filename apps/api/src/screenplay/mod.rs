// Screenplay pipeline: prompt building, response recovery, session state.
// All text-generation calls go through llm_client; image calls through image_client.

pub mod generator;
pub mod handlers;
pub mod models;
pub mod preview;
pub mod prompt_builder;
pub mod prompts;
pub mod recovery;
pub mod session;

pub use prompt_builder::{build_prompt, PromptBounds};
pub use recovery::recover_screenplay;
