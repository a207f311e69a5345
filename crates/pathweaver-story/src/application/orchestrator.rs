//! Sequences story generation and owns its status transitions.
//!
//! Each phase runs as one named step. Whatever fails inside a step is
//! caught here, recorded on the story as `"<phase> failed: <cause>"`, and
//! the story is marked `FAILED`. Only a failure to record that status
//! escapes to the caller.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use pathweaver_core::assets::AssetRenderer;
use pathweaver_core::clock::Clock;
use pathweaver_core::error::DomainError;
use pathweaver_core::generator::StructuredGenerator;
use pathweaver_core::id::IdGenerator;
use pathweaver_core::repository::{StoredStoryNode, StoryRepository, StoryStatus};
use tracing::{Instrument, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::application::completion_gate::CompletionGate;
use crate::application::dispatcher::AssetRequestDispatcher;
use crate::application::flattener::flatten;
use crate::application::outline_generator::generate_outline;
use crate::application::tree_builder::ChoiceTreeBuilder;
use crate::domain::aggregates::{GenerationPhase, Story};
use crate::domain::commands::GenerateStory;
use crate::domain::settings::{GenerationSettings, IncompleteAssetsPolicy};
use crate::domain::tree::{ChoiceNode, FlatStoryNode};

/// A failed generation step.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {source}")]
pub struct StoryFailure {
    /// Step that failed.
    pub phase: GenerationPhase,
    /// What went wrong.
    pub source: DomainError,
}

impl StoryFailure {
    fn at(phase: GenerationPhase) -> impl FnOnce(DomainError) -> Self {
        move |source| Self { phase, source }
    }
}

/// Terminal result of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryOutcome {
    /// The story was marked `GENERATED`.
    Generated {
        /// The story.
        story_id: Uuid,
        /// Persisted tree nodes.
        node_count: usize,
        /// Assets still absent when the story was finalized anyway.
        missing_assets: BTreeSet<String>,
    },
    /// The story was marked `FAILED`.
    Failed {
        /// The story.
        story_id: Uuid,
        /// The recorded error message.
        message: String,
    },
}

impl StoryOutcome {
    /// The status the story ended in.
    #[must_use]
    pub fn status(&self) -> StoryStatus {
        match self {
            Self::Generated { .. } => StoryStatus::Generated,
            Self::Failed { .. } => StoryStatus::Failed,
        }
    }
}

/// Collaborators of the orchestrator.
#[derive(Clone)]
pub struct StoryPorts {
    /// Text generation.
    pub generator: Arc<dyn StructuredGenerator>,
    /// Story and node persistence.
    pub repository: Arc<dyn StoryRepository>,
    /// Media rendering.
    pub renderer: Arc<dyn AssetRenderer>,
    /// Waits for rendered media.
    pub completion_gate: Arc<dyn CompletionGate>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Identifier source for stories and nodes.
    pub ids: Arc<Mutex<dyn IdGenerator + Send>>,
}

/// Drives a story from prompt to a terminal status.
pub struct StoryOrchestrator {
    ports: StoryPorts,
    dispatcher: AssetRequestDispatcher,
    settings: GenerationSettings,
}

impl StoryOrchestrator {
    /// Creates an orchestrator over `ports` using `settings`.
    #[must_use]
    pub fn new(ports: StoryPorts, settings: GenerationSettings) -> Self {
        let dispatcher =
            AssetRequestDispatcher::new(Arc::clone(&ports.renderer), settings.dispatch_timeout);
        Self {
            ports,
            dispatcher,
            settings,
        }
    }

    /// Records a new `PROCESSING` story and returns its id. Nothing is
    /// generated yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank prompt or user, or the
    /// repository error if the story cannot be stored.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id))]
    pub async fn submit(&self, command: &GenerateStory) -> Result<Uuid, DomainError> {
        let story_id = self.next_id()?;
        let story = Story::accept(
            story_id,
            &command.user_id,
            &command.prompt,
            self.ports.clock.as_ref(),
        )?;
        self.ports.repository.insert_story(&story.to_stored()).await?;
        info!(%story_id, "story accepted");
        Ok(story_id)
    }

    /// Runs every generation phase for a submitted story and records the
    /// terminal status.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StoryNotFound` if the story does not exist,
    /// `DomainError::Validation` if it already finished, or the repository
    /// error if the terminal status could not be recorded. Generation
    /// failures, including a failed read of the story itself, are not
    /// errors; they yield `StoryOutcome::Failed`.
    pub async fn run(
        &self,
        story_id: Uuid,
        command: &GenerateStory,
    ) -> Result<StoryOutcome, DomainError> {
        let span = info_span!(
            "generate_story",
            %story_id,
            correlation_id = %command.correlation_id
        );
        self.run_story(story_id).instrument(span).await
    }

    /// Submits and runs a story in one call.
    ///
    /// # Errors
    ///
    /// Same as `submit` and `run`.
    pub async fn generate(&self, command: &GenerateStory) -> Result<StoryOutcome, DomainError> {
        let story_id = self.submit(command).await?;
        self.run(story_id, command).await
    }

    async fn run_story(&self, story_id: Uuid) -> Result<StoryOutcome, DomainError> {
        let stored = match self.ports.repository.find_story(story_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Err(DomainError::StoryNotFound(story_id)),
            Err(err) => return self.record_load_failure(story_id, &err).await,
        };
        let mut story = Story::from_stored(stored);
        if story.status().is_terminal() {
            return Err(DomainError::Validation(format!(
                "story {story_id} is already {}",
                story.status()
            )));
        }

        match self.execute(&mut story).await {
            Ok(outcome) => Ok(outcome),
            Err(failure) => self.record_failure(&mut story, &failure).await,
        }
    }

    async fn execute(&self, story: &mut Story) -> Result<StoryOutcome, StoryFailure> {
        let story_id = story.id;
        let prompt = story.prompt().to_owned();
        let generator = self.ports.generator.as_ref();
        let repository = self.ports.repository.as_ref();

        let outline = step(
            story,
            GenerationPhase::GeneratingOutline,
            generate_outline(generator, &prompt, self.settings.generation_timeout),
        )
        .await?;

        step(
            story,
            GenerationPhase::PersistingOutline,
            repository.save_outline(story_id, &outline.to_stored(), self.ports.clock.now()),
        )
        .await?;

        let builder = ChoiceTreeBuilder::new(generator, self.settings.generation_timeout);
        let tree = step(
            story,
            GenerationPhase::GeneratingTree,
            builder.build(
                &outline,
                self.settings.max_depth,
                self.settings.max_concurrent,
            ),
        )
        .await?;

        let nodes = step(story, GenerationPhase::PersistingTree, async {
            let nodes = self.flatten_tree(&tree, story_id)?;
            let rows = to_rows(&nodes)?;
            repository.insert_nodes(story_id, &rows).await?;
            Ok::<_, DomainError>(nodes)
        })
        .await?;

        let report = step(story, GenerationPhase::DispatchingAssets, async {
            Ok::<_, DomainError>(self
                .dispatcher
                .dispatch(
                    story_id,
                    &nodes,
                    &outline.banner_image_prompt,
                    outline.theme_audio_prompt.as_deref(),
                )
                .await)
        })
        .await?;

        let missing_assets = step(story, GenerationPhase::AwaitingAssets, async {
            let expected = report.expected_suffixes();
            let completion = self
                .ports
                .completion_gate
                .await_completion(story_id, &expected)
                .await?;
            if completion.completed {
                return Ok(BTreeSet::new());
            }
            match self.settings.incomplete_assets {
                IncompleteAssetsPolicy::Fail => Err(DomainError::AssetsIncomplete {
                    missing: completion.missing.len(),
                    iterations: completion.iterations,
                }),
                IncompleteAssetsPolicy::Finalize => {
                    warn!(
                        %story_id,
                        missing = ?completion.missing,
                        "finalizing with missing assets"
                    );
                    Ok(completion.missing)
                }
            }
        })
        .await?;

        story
            .enter(GenerationPhase::Finalizing)
            .map_err(StoryFailure::at(GenerationPhase::Finalizing))?;
        let mut finalized = story.clone();
        finalized
            .mark_generated(self.ports.clock.as_ref())
            .map_err(StoryFailure::at(GenerationPhase::Finalizing))?;
        repository
            .update_story_status(story_id, StoryStatus::Generated, None, self.ports.clock.now())
            .await
            .map_err(StoryFailure::at(GenerationPhase::Finalizing))?;
        *story = finalized;

        info!(%story_id, nodes = nodes.len(), "story generated");
        Ok(StoryOutcome::Generated {
            story_id,
            node_count: nodes.len(),
            missing_assets,
        })
    }

    async fn record_failure(
        &self,
        story: &mut Story,
        failure: &StoryFailure,
    ) -> Result<StoryOutcome, DomainError> {
        let message = failure.to_string();
        error!(
            story_id = %story.id,
            phase = %failure.phase,
            error = %failure.source,
            "story generation failed"
        );

        story.mark_failed(&message, self.ports.clock.as_ref())?;
        if let Err(err) = self
            .ports
            .repository
            .update_story_status(
                story.id,
                StoryStatus::Failed,
                Some(&message),
                self.ports.clock.now(),
            )
            .await
        {
            error!(story_id = %story.id, error = %err, "could not record story failure");
            return Err(err);
        }

        Ok(StoryOutcome::Failed {
            story_id: story.id,
            message,
        })
    }

    /// The story could not be read back, so it is marked `FAILED` without
    /// going through the aggregate.
    async fn record_load_failure(
        &self,
        story_id: Uuid,
        cause: &DomainError,
    ) -> Result<StoryOutcome, DomainError> {
        let message = format!("loading story failed: {cause}");
        error!(%story_id, error = %cause, "could not load story");

        if let Err(err) = self
            .ports
            .repository
            .update_story_status(
                story_id,
                StoryStatus::Failed,
                Some(&message),
                self.ports.clock.now(),
            )
            .await
        {
            error!(%story_id, error = %err, "could not record story failure");
            return Err(err);
        }

        Ok(StoryOutcome::Failed { story_id, message })
    }

    fn next_id(&self) -> Result<Uuid, DomainError> {
        let mut ids = self
            .ports
            .ids
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("id generator lock poisoned: {e}")))?;
        Ok(ids.next_id())
    }

    fn flatten_tree(
        &self,
        tree: &ChoiceNode,
        story_id: Uuid,
    ) -> Result<Vec<FlatStoryNode>, DomainError> {
        let mut ids = self
            .ports
            .ids
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("id generator lock poisoned: {e}")))?;
        Ok(flatten(tree, story_id, &mut *ids))
    }
}

/// Runs one phase of `story`, logging entry and exit.
async fn step<T>(
    story: &mut Story,
    phase: GenerationPhase,
    work: impl Future<Output = Result<T, DomainError>>,
) -> Result<T, StoryFailure> {
    story.enter(phase).map_err(StoryFailure::at(phase))?;
    info!(story_id = %story.id, %phase, "step started");
    let output = work.await.map_err(StoryFailure::at(phase))?;
    info!(story_id = %story.id, %phase, "step completed");
    Ok(output)
}

fn to_rows(nodes: &[FlatStoryNode]) -> Result<Vec<StoredStoryNode>, DomainError> {
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let position = i32::try_from(index)
                .map_err(|_| DomainError::Infrastructure("too many story nodes".into()))?;
            Ok(node.to_stored(position))
        })
        .collect()
}
