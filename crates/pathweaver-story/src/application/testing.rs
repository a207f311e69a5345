//! Fixtures shared by the application tests.

use pathweaver_core::generator::GenerationRequest;
use pathweaver_test_support::{ScriptedGenerator, ScriptedReply};
use serde_json::{Value, json};

use crate::application::prompts::{ENDING_TASK, OUTLINE_TASK, SCENE_TASK};
use crate::domain::outline::StoryOutline;
use crate::domain::tree::{ChoiceNode, MAX_CHOICES, MIN_CHOICES};

pub(crate) fn outline() -> StoryOutline {
    StoryOutline {
        title: "T".to_owned(),
        description: "D".to_owned(),
        banner_image_prompt: "pixel art cover".to_owned(),
        theme_audio_prompt: None,
    }
}

pub(crate) fn outline_json(theme: Option<&str>) -> Value {
    json!({
        "title": "T",
        "description": "D",
        "banner_image_prompt": "pixel art cover",
        "theme_audio_prompt": theme,
    })
}

pub(crate) fn scene_json(call: usize, choices: usize) -> Value {
    let choices: Vec<Value> = (0..choices)
        .map(|i| {
            json!({
                "label": format!("Path {call}.{i}"),
                "description": format!("Walk path {i}"),
            })
        })
        .collect();
    json!({
        "title": format!("Scene {call}"),
        "narrative": format!("Something happens ({call})."),
        "image_prompt": format!("scene {call}"),
        "is_terminal": false,
        "choices": choices,
    })
}

pub(crate) fn ending_json(call: usize) -> Value {
    json!({
        "title": format!("Ending {call}"),
        "narrative": "And so it ends.",
        "image_prompt": format!("ending {call}"),
    })
}

/// Answers outline, scene and ending requests with valid payloads, offering
/// `choices` options at every continuation.
pub(crate) fn well_behaved_reply(
    request: &GenerationRequest,
    call: usize,
    choices: usize,
) -> ScriptedReply {
    match request.task {
        OUTLINE_TASK => ScriptedReply::Json(outline_json(None)),
        SCENE_TASK => ScriptedReply::Json(scene_json(call, choices)),
        ENDING_TASK => ScriptedReply::Json(ending_json(call)),
        other => panic!("unexpected task {other}"),
    }
}

pub(crate) fn well_behaved_generator(choices: usize) -> ScriptedGenerator {
    ScriptedGenerator::new(move |request, call| well_behaved_reply(request, call, choices))
}

/// Checks the structural invariants of a generated tree.
pub(crate) fn assert_tree_shape(node: &ChoiceNode, depth: u32, max_depth: u32) {
    assert!(depth <= max_depth, "node at depth {depth} exceeds {max_depth}");
    if node.children.is_empty() {
        assert!(node.is_terminal, "leaf at depth {depth} is not terminal");
    } else {
        assert!(!node.is_terminal, "terminal node at depth {depth} has children");
        assert!(
            (MIN_CHOICES..=MAX_CHOICES).contains(&node.children.len()),
            "node at depth {depth} has {} children",
            node.children.len()
        );
        for child in &node.children {
            assert_tree_shape(child, depth + 1, max_depth);
        }
    }
}
