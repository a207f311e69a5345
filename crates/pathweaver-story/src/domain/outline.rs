//! The story outline: the root-level premise generated once per story.

use pathweaver_core::error::DomainError;
use pathweaver_core::repository::StoredOutline;
use serde::{Deserialize, Serialize};

/// Title, scene-setting prose and media prompts of a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryOutline {
    /// Story title.
    pub title: String,
    /// Scene-setting description the tree starts from.
    pub description: String,
    /// Cover image prompt.
    pub banner_image_prompt: String,
    /// Theme audio prompt, if any.
    #[serde(default)]
    pub theme_audio_prompt: Option<String>,
}

impl StoryOutline {
    /// Checks a freshly generated outline and normalizes its optional fields.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::GenerationContract` if a required field is blank.
    pub fn validated(mut self) -> Result<Self, DomainError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("banner_image_prompt", &self.banner_image_prompt),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::GenerationContract(format!(
                    "outline {field} is blank"
                )));
            }
        }
        self.theme_audio_prompt = self
            .theme_audio_prompt
            .filter(|prompt| !prompt.trim().is_empty());
        Ok(self)
    }

    /// Converts into the persisted outline fields.
    #[must_use]
    pub fn to_stored(&self) -> StoredOutline {
        StoredOutline {
            title: self.title.clone(),
            description: self.description.clone(),
            banner_image_prompt: self.banner_image_prompt.clone(),
            theme_audio_prompt: self.theme_audio_prompt.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(title: &str, theme: Option<&str>) -> StoryOutline {
        StoryOutline {
            title: title.to_owned(),
            description: "A lighthouse keeper hears knocking from below.".to_owned(),
            banner_image_prompt: "Retro pixel lighthouse in a storm".to_owned(),
            theme_audio_prompt: theme.map(str::to_owned),
        }
    }

    #[test]
    fn test_validated_accepts_complete_outline() {
        let result = outline("The Keeper", Some("slow synth drone")).validated();

        let outline = result.unwrap();
        assert_eq!(outline.theme_audio_prompt.as_deref(), Some("slow synth drone"));
    }

    #[test]
    fn test_validated_rejects_blank_title() {
        let result = outline("   ", None).validated();

        match result.unwrap_err() {
            DomainError::GenerationContract(msg) => assert!(msg.contains("title")),
            other => panic!("expected GenerationContract, got {other:?}"),
        }
    }

    #[test]
    fn test_validated_drops_blank_theme_prompt() {
        let outline = outline("The Keeper", Some("  ")).validated().unwrap();

        assert_eq!(outline.theme_audio_prompt, None);
    }
}
