//! Structured-generation port.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DomainError;

/// A single structured-completion request.
///
/// Prompt text is fully rendered by the caller; the generator only
/// transports it and enforces that the reply is JSON shaped like
/// `response_schema`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// Short task name, used as the schema name and in logs.
    pub task: &'static str,
    /// System-level instructions.
    pub instructions: String,
    /// User-level prompt carrying the story context.
    pub prompt: String,
    /// JSON schema the response must satisfy.
    pub response_schema: serde_json::Value,
}

/// Text-generation capability returning schema-shaped JSON.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    /// Issue one generation call.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Generation` for backend failures and
    /// `DomainError::GenerationContract` when the reply is not valid JSON.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, DomainError>;
}
