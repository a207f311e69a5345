//! Recursive, depth-bounded expansion of an outline into a choice tree.
//!
//! Every node costs one structured-generation call. Calls are bounded by a
//! single semaphore shared by the whole expansion, so the fan-out at deeper
//! levels never puts more than `max_concurrent` calls in flight. A node holds
//! its permit only for its own call (retries included) and releases it
//! before its children are expanded; holding it across the fan-out would let
//! parents starve their own children.

use std::collections::HashSet;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use pathweaver_core::error::DomainError;
use pathweaver_core::generator::StructuredGenerator;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, info_span};

use crate::application::prompts;
use crate::application::retry::generate_validated;
use crate::domain::outline::StoryOutline;
use crate::domain::tree::{ChoiceNode, MAX_CHOICES, MIN_CHOICES, PathStep, ROOT_CHOICE_LABEL};

/// Raw situation as returned by the generator.
#[derive(Debug, Deserialize)]
struct SceneResponse {
    title: String,
    narrative: String,
    image_prompt: String,
    #[serde(default)]
    is_terminal: bool,
    #[serde(default)]
    choices: Vec<ChoiceOption>,
}

/// One onward choice offered by a situation.
#[derive(Debug, Clone, Deserialize)]
struct ChoiceOption {
    label: String,
    description: String,
}

/// A validated situation.
#[derive(Debug)]
struct Scene {
    title: String,
    narrative: String,
    image_prompt: String,
    choices: Vec<ChoiceOption>,
}

impl Scene {
    /// Validates a response for a node with `remaining` choices left. An
    /// ending is produced when the budget is spent or the generator declares
    /// the story complete; any choices it returned alongside are dropped.
    fn from_response(value: serde_json::Value, remaining: u32) -> Result<Self, DomainError> {
        let response: SceneResponse = serde_json::from_value(value)
            .map_err(|e| DomainError::GenerationContract(format!("malformed scene: {e}")))?;

        for (field, text) in [
            ("title", &response.title),
            ("narrative", &response.narrative),
            ("image_prompt", &response.image_prompt),
        ] {
            if text.trim().is_empty() {
                return Err(DomainError::GenerationContract(format!(
                    "scene {field} is blank"
                )));
            }
        }

        let choices = if remaining == 0 || response.is_terminal {
            Vec::new()
        } else {
            validate_choices(response.choices)?
        };

        Ok(Self {
            title: response.title,
            narrative: response.narrative,
            image_prompt: response.image_prompt,
            choices,
        })
    }
}

fn validate_choices(choices: Vec<ChoiceOption>) -> Result<Vec<ChoiceOption>, DomainError> {
    if !(MIN_CHOICES..=MAX_CHOICES).contains(&choices.len()) {
        return Err(DomainError::GenerationContract(format!(
            "expected {MIN_CHOICES} to {MAX_CHOICES} choices, got {}",
            choices.len()
        )));
    }

    let mut seen = HashSet::with_capacity(choices.len());
    for choice in &choices {
        let label = choice.label.trim().to_lowercase();
        if label.is_empty() {
            return Err(DomainError::GenerationContract(
                "choice label is blank".into(),
            ));
        }
        if !seen.insert(label) {
            return Err(DomainError::GenerationContract(format!(
                "duplicate choice label: {}",
                choice.label.trim()
            )));
        }
    }
    Ok(choices)
}

/// Builds choice trees with a structured generator.
pub struct ChoiceTreeBuilder<'a> {
    generator: &'a dyn StructuredGenerator,
    generation_timeout: Duration,
}

impl<'a> ChoiceTreeBuilder<'a> {
    /// Creates a builder issuing calls through `generator`, each attempt
    /// bounded by `generation_timeout`.
    #[must_use]
    pub fn new(generator: &'a dyn StructuredGenerator, generation_timeout: Duration) -> Self {
        Self {
            generator,
            generation_timeout,
        }
    }

    /// Expands `outline` into a tree whose endings are at most `max_depth`
    /// choices from the root, with at most `max_concurrent` generation calls
    /// in flight.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `max_concurrent` is zero, or the
    /// error of the first node whose generation failed after all retries.
    pub async fn build(
        &self,
        outline: &StoryOutline,
        max_depth: u32,
        max_concurrent: usize,
    ) -> Result<ChoiceNode, DomainError> {
        if max_concurrent == 0 {
            return Err(DomainError::Validation(
                "max_concurrent must be at least 1".into(),
            ));
        }

        let gate = Semaphore::new(max_concurrent);
        let root = Incoming {
            label: ROOT_CHOICE_LABEL.to_owned(),
            description: outline.description.clone(),
        };
        let tree = self
            .expand(&gate, outline, Vec::new(), root, 0, max_depth)
            .await?;

        info!(
            nodes = tree.node_count(),
            depth = tree.depth(),
            max_depth,
            "choice tree generated"
        );
        Ok(tree)
    }

    fn expand<'s>(
        &'s self,
        gate: &'s Semaphore,
        outline: &'s StoryOutline,
        path: Vec<PathStep>,
        incoming: Incoming,
        depth: u32,
        max_depth: u32,
    ) -> BoxFuture<'s, Result<ChoiceNode, DomainError>> {
        let remaining = max_depth - depth;
        let span = info_span!("expand_node", depth, remaining, choice = %incoming.label);

        async move {
            let scene = {
                let _permit = gate.acquire().await.map_err(|_| {
                    DomainError::Infrastructure("generation gate closed".into())
                })?;
                let request = prompts::scene_request(outline, &path, remaining);
                generate_validated(self.generator, &request, self.generation_timeout, |value| {
                    Scene::from_response(value, remaining)
                })
                .await?
            };
            debug!(choices = scene.choices.len(), "node generated");

            let expansions = scene.choices.iter().map(|choice| {
                let mut child_path = path.clone();
                child_path.push(PathStep {
                    situation: scene.narrative.clone(),
                    choice_label: choice.label.clone(),
                    choice_description: choice.description.clone(),
                });
                let incoming = Incoming {
                    label: choice.label.clone(),
                    description: choice.description.clone(),
                };
                self.expand(gate, outline, child_path, incoming, depth + 1, max_depth)
            });
            let children = join_all(expansions)
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ChoiceNode {
                title: scene.title,
                narrative_text: scene.narrative,
                image_prompt: scene.image_prompt,
                incoming_choice_label: incoming.label,
                incoming_choice_description: incoming.description,
                is_terminal: children.is_empty(),
                children,
            })
        }
        .instrument(span)
        .boxed()
    }
}

/// The choice that leads to the node being expanded.
struct Incoming {
    label: String,
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prompts::{ENDING_TASK, SCENE_TASK};
    use crate::application::testing::{
        assert_tree_shape, ending_json, outline, scene_json, well_behaved_generator,
        well_behaved_reply,
    };
    use pathweaver_test_support::{ScriptedGenerator, ScriptedReply};
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_depth_one_yields_root_with_terminal_children() {
        // Arrange
        let generator = well_behaved_generator(3);
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        // Act
        let root = builder.build(&outline(), 1, 4).await.unwrap();

        // Assert
        assert_eq!(root.incoming_choice_label, ROOT_CHOICE_LABEL);
        assert_eq!(root.incoming_choice_description, "D");
        assert!(!root.is_terminal);
        assert_eq!(root.children.len(), 3);
        for child in &root.children {
            assert!(child.is_terminal);
            assert!(child.children.is_empty());
        }
        assert_eq!(generator.call_count(), 4);
    }

    #[tokio::test]
    async fn test_every_leaf_respects_max_depth() {
        let generator = well_behaved_generator(2);
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        let root = builder.build(&outline(), 3, 8).await.unwrap();

        assert_tree_shape(&root, 0, 3);
        assert_eq!(root.depth(), 3);
        // 1 + 2 + 4 + 8 nodes in a full binary tree of depth 3.
        assert_eq!(root.node_count(), 15);
        let endings = generator
            .requests()
            .iter()
            .filter(|r| r.task == ENDING_TASK)
            .count();
        assert_eq!(endings, 8);
    }

    #[tokio::test]
    async fn test_zero_depth_yields_single_ending() {
        let generator = well_behaved_generator(2);
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        let root = builder.build(&outline(), 0, 1).await.unwrap();

        assert!(root.is_terminal);
        assert_eq!(root.node_count(), 1);
        assert_eq!(generator.requests()[0].task, ENDING_TASK);
    }

    #[tokio::test]
    async fn test_early_termination_is_honoured() {
        // The root continues, but the first child declares the story over.
        let generator = ScriptedGenerator::new(|request, call| {
            if call == 1 {
                let mut scene = scene_json(call, 2);
                scene["is_terminal"] = json!(true);
                ScriptedReply::Json(scene)
            } else {
                well_behaved_reply(request, call, 2)
            }
        });
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        let root = builder.build(&outline(), 2, 1).await.unwrap();

        assert_tree_shape(&root, 0, 2);
        assert!(root.children[0].is_terminal);
        assert!(root.children[0].children.is_empty());
        assert_eq!(root.children[1].children.len(), 2);
    }

    #[tokio::test]
    async fn test_children_receive_path_context() {
        let generator = well_behaved_generator(2);
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        builder.build(&outline(), 1, 1).await.unwrap();

        let requests = generator.requests();
        assert_eq!(requests[0].task, SCENE_TASK);
        assert!(requests[0].prompt.contains("no choices yet"));
        for child_request in &requests[1..] {
            assert!(child_request.prompt.contains("Something happens (0)."));
            assert!(child_request.prompt.contains("The reader chose \"Path 0."));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_timing_out_twice_still_generates() {
        // Arrange: the root call hangs on its first two attempts.
        let generator = ScriptedGenerator::new(|request, call| {
            if call < 2 {
                ScriptedReply::Hang
            } else {
                well_behaved_reply(request, call, 2)
            }
        });
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        // Act
        let root = builder.build(&outline(), 1, 2).await.unwrap();

        // Assert
        assert_eq!(root.title, "Scene 2");
        assert_eq!(root.children.len(), 2);
        assert_tree_shape(&root, 0, 1);
        assert_eq!(generator.call_count(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_labels_fail_the_build() {
        let generator = ScriptedGenerator::new(|request, call| {
            if request.task == SCENE_TASK && call > 0 {
                ScriptedReply::Json(json!({
                    "title": "Fork",
                    "narrative": "Two doors.",
                    "image_prompt": "two doors",
                    "is_terminal": false,
                    "choices": [
                        { "label": "Open the door", "description": "left" },
                        { "label": "open the door ", "description": "right" },
                    ],
                }))
            } else {
                well_behaved_reply(request, call, 2)
            }
        });
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        let result = builder.build(&outline(), 2, 4).await;

        match result.unwrap_err() {
            DomainError::GenerationContract(msg) => assert!(msg.contains("duplicate")),
            other => panic!("expected GenerationContract, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_choice_count_is_retried_then_fatal() {
        let generator = ScriptedGenerator::new(|_, call| ScriptedReply::Json(scene_json(call, 1)));
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        let result = builder.build(&outline(), 2, 1).await;

        assert!(matches!(result, Err(DomainError::GenerationContract(_))));
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_too_many_choices_is_a_contract_violation() {
        let generator = ScriptedGenerator::new(|_, call| ScriptedReply::Json(scene_json(call, 4)));
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        let result = builder.build(&outline(), 1, 1).await;

        match result.unwrap_err() {
            DomainError::GenerationContract(msg) => assert!(msg.contains("got 4")),
            other => panic!("expected GenerationContract, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_terminal_response_at_depth_limit_ignores_extra_fields() {
        let generator = ScriptedGenerator::new(|request, call| {
            if request.task == ENDING_TASK {
                let mut ending = ending_json(call);
                ending["choices"] = json!([{ "label": "More", "description": "keep going" }]);
                ScriptedReply::Json(ending)
            } else {
                well_behaved_reply(request, call, 2)
            }
        });
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        let root = builder.build(&outline(), 1, 2).await.unwrap();

        assert_tree_shape(&root, 0, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded_across_levels() {
        // Arrange: slow calls so branches overlap.
        let generator = well_behaved_generator(3).with_latency(Duration::from_millis(50));
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        // Act
        let root = builder.build(&outline(), 3, 4).await.unwrap();

        // Assert
        assert_eq!(root.node_count(), 1 + 3 + 9 + 27);
        assert_eq!(generator.peak_in_flight(), 4);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_rejected() {
        let generator = well_behaved_generator(2);
        let builder = ChoiceTreeBuilder::new(&generator, TIMEOUT);

        let result = builder.build(&outline(), 1, 0).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(generator.call_count(), 0);
    }
}
