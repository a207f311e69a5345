//! Prompt rendering and response schemas for every generation call.

use std::fmt::Write as _;

use pathweaver_core::generator::GenerationRequest;
use serde_json::{Value, json};

use crate::domain::outline::StoryOutline;
use crate::domain::tree::{MAX_CHOICES, MIN_CHOICES, PathStep};

/// Task name of the outline call.
pub const OUTLINE_TASK: &str = "story_outline";

/// Task name of a continuation call (a situation with onward choices).
pub const SCENE_TASK: &str = "story_scene";

/// Task name of an ending call (a situation that concludes the story).
pub const ENDING_TASK: &str = "story_ending";

const OUTLINE_INSTRUCTIONS: &str = "\
You turn a reader's prompt into the opening of an interactive, branching story.
Produce:
- title: a short title for the story.
- description: two or three sentences setting the opening scene. Only set things \
up; later calls continue the story.
- banner_image_prompt: a long, concrete description of pixel-art cover art for the \
story, naming subjects, colours, lighting and background.
- theme_audio_prompt: two or three sentences describing a melody or beat that fits \
the story, or null.";

const IMAGE_GUIDANCE: &str = "\
image_prompt must describe one still image: key elements and items, what the \
characters are doing, and the mood, in a single dense sentence such as \
\"Dim cave with violet crystal walls, a cyan-lit capsule, an awestruck miner \
gripping a pickaxe, drifting dust\".";

/// Renders the outline request for `prompt`.
#[must_use]
pub fn outline_request(prompt: &str) -> GenerationRequest {
    GenerationRequest {
        task: OUTLINE_TASK,
        instructions: OUTLINE_INSTRUCTIONS.to_owned(),
        prompt: prompt.trim().to_owned(),
        response_schema: outline_schema(),
    }
}

/// Renders the request for the situation reached through `path`, with
/// `remaining` choices left before the story must end.
#[must_use]
pub fn scene_request(
    outline: &StoryOutline,
    path: &[PathStep],
    remaining: u32,
) -> GenerationRequest {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Story title: {}", outline.title);
    let _ = writeln!(prompt, "Opening: {}", outline.description);
    if path.is_empty() {
        prompt.push_str("\nThe reader has made no choices yet.\n");
    } else {
        prompt.push_str("\nWhat happened so far, in order:\n");
        for (turn, step) in path.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. {} The reader chose \"{}\": {}",
                turn + 1,
                step.situation,
                step.choice_label,
                step.choice_description
            );
        }
    }

    if remaining == 0 {
        prompt.push_str("\nWrite the final situation that concludes the story.\n");
        GenerationRequest {
            task: ENDING_TASK,
            instructions: ending_instructions(),
            prompt,
            response_schema: ending_schema(),
        }
    } else {
        let _ = writeln!(
            prompt,
            "\nWrite the next situation. The story must end within {remaining} more choice(s)."
        );
        GenerationRequest {
            task: SCENE_TASK,
            instructions: scene_instructions(remaining),
            prompt,
            response_schema: scene_schema(),
        }
    }
}

fn scene_instructions(remaining: u32) -> String {
    format!(
        "You continue an interactive, branching story from the reader's choices.\n\
Produce:\n\
- title: a short title for the current situation.\n\
- narrative: one or two sentences on what happens after the last choice, \
leading up to the next decision.\n\
- image_prompt: the illustration of this situation.\n\
- is_terminal: true only if the story is already complete here.\n\
- choices: {MIN_CHOICES} to {MAX_CHOICES} options with distinct labels, each \
with a one-sentence description; an empty list when is_terminal is true.\n\
Rules:\n\
- Choices must push the story in clearly different directions and never lead \
back to an earlier situation.\n\
- The story has at most {remaining} more choice(s); pace it so the hero wins, \
dies or otherwise reaches an ending by then.\n\
{IMAGE_GUIDANCE}"
    )
}

fn ending_instructions() -> String {
    format!(
        "You write the final situation of an interactive, branching story.\n\
Produce:\n\
- title: a short title for the conclusion.\n\
- narrative: one or two sentences on how the story ends; the hero wins, dies or \
otherwise reaches a satisfying end, and no further choices remain.\n\
- image_prompt: the illustration of the final scene.\n\
{IMAGE_GUIDANCE}"
    )
}

/// Schema of the outline response.
#[must_use]
pub fn outline_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "description": { "type": "string" },
            "banner_image_prompt": { "type": "string" },
            "theme_audio_prompt": { "type": ["string", "null"] }
        },
        "required": ["title", "description", "banner_image_prompt", "theme_audio_prompt"],
        "additionalProperties": false
    })
}

/// Schema of a continuation response.
#[must_use]
pub fn scene_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "narrative": { "type": "string" },
            "image_prompt": { "type": "string" },
            "is_terminal": { "type": "boolean" },
            "choices": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["label", "description"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["title", "narrative", "image_prompt", "is_terminal", "choices"],
        "additionalProperties": false
    })
}

/// Schema of an ending response.
#[must_use]
pub fn ending_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "narrative": { "type": "string" },
            "image_prompt": { "type": "string" }
        },
        "required": ["title", "narrative", "image_prompt"],
        "additionalProperties": false
    })
}
