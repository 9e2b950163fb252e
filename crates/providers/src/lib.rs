//! `rh-providers`: chat-completion adapters used by the planner.
//!
//! Only the OpenAI chat-completions wire format is spoken; Azure OpenAI
//! is the same format behind a deployment-scoped URL and an `api-key`
//! header.

pub mod openai_compat;
pub mod traits;

// Re-exports for convenience.
pub use openai_compat::{OpenAiCompatProvider, ProviderTarget};
pub use traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
