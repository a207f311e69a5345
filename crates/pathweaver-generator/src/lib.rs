//! Pathweaver: structured text generation over an OpenAI-compatible
//! chat-completions API.

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiStructuredGenerator};
