//! Outline generation: prompt → `StoryOutline`.

use std::time::Duration;

use pathweaver_core::error::DomainError;
use pathweaver_core::generator::StructuredGenerator;
use tracing::info;

use crate::application::prompts;
use crate::application::retry::generate_validated;
use crate::domain::outline::StoryOutline;

/// Generates the outline of a story from the reader's prompt.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank prompt, otherwise the last
/// generation error once all attempts failed.
pub async fn generate_outline(
    generator: &dyn StructuredGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<StoryOutline, DomainError> {
    if prompt.trim().is_empty() {
        return Err(DomainError::Validation("prompt must not be blank".into()));
    }

    let request = prompts::outline_request(prompt);
    let outline = generate_validated(generator, &request, timeout, |value| {
        serde_json::from_value::<StoryOutline>(value)
            .map_err(|e| DomainError::GenerationContract(format!("malformed outline: {e}")))?
            .validated()
    })
    .await?;

    info!(title = %outline.title, "outline generated");
    Ok(outline)
}
