mod api;
pub mod prompts;
mod provider;

pub use api::LlmApiClient;
pub use provider::{ChatMessage, ChatMessageRole, CompletionOptions, LlmBackend, LlmProvider};
