//! Routes for story submission and retrieval.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span, instrument};
use uuid::Uuid;

use pathweaver_story::application::command_handlers;
use pathweaver_story::application::query_handlers::{self, StoryNodeView, StoryView};
use pathweaver_story::domain::commands::{DeleteStory, GenerateStory};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    /// The premise to generate from.
    pub prompt: String,
    /// Owner of the story.
    pub user_id: String,
}

/// Response body returned once a story is accepted.
#[derive(Debug, Serialize)]
pub struct CreateStoryResponse {
    /// The new story; poll it until it leaves `PROCESSING`.
    pub story_id: Uuid,
}

/// Query parameters naming the acting user.
#[derive(Debug, Deserialize)]
pub struct UserParams {
    /// Owner of the stories.
    pub user_id: String,
}

/// POST /
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn create_story(
    State(state): State<AppState>,
    Json(request): Json<CreateStoryRequest>,
) -> Result<(StatusCode, Json<CreateStoryResponse>), ApiError> {
    let command = GenerateStory {
        correlation_id: Uuid::new_v4(),
        user_id: request.user_id,
        prompt: request.prompt,
    };

    info!(correlation_id = %command.correlation_id, "handling generate_story command");

    let story_id = state.orchestrator.submit(&command).await?;

    let orchestrator = state.orchestrator.clone();
    let span = info_span!("story_task", %story_id);
    tokio::spawn(
        async move {
            if let Err(e) = orchestrator.run(story_id, &command).await {
                error!(error = %e, "story run aborted");
            }
        }
        .instrument(span),
    );

    Ok((StatusCode::ACCEPTED, Json(CreateStoryResponse { story_id })))
}

/// GET /{story_id}
#[instrument(skip(state))]
async fn get_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<StoryView>, ApiError> {
    let view = query_handlers::get_story_by_id(story_id, &*state.story_repository).await?;
    Ok(Json(view))
}

/// GET /{story_id}/nodes
#[instrument(skip(state))]
async fn list_nodes(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<Vec<StoryNodeView>>, ApiError> {
    let nodes = query_handlers::list_story_nodes(story_id, &*state.story_repository).await?;
    Ok(Json(nodes))
}

/// GET /?user_id=
#[instrument(skip(state, params), fields(user_id = %params.user_id))]
async fn list_stories(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<Json<Vec<StoryView>>, ApiError> {
    let stories =
        query_handlers::list_user_stories(&params.user_id, &*state.story_repository).await?;
    Ok(Json(stories))
}

/// DELETE /{story_id}?user_id=
#[instrument(skip(state, params), fields(user_id = %params.user_id))]
async fn delete_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Query(params): Query<UserParams>,
) -> Result<StatusCode, ApiError> {
    let command = DeleteStory {
        correlation_id: Uuid::new_v4(),
        story_id,
        user_id: params.user_id,
    };
    command_handlers::handle_delete_story(&command, &*state.story_repository).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for stories.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_story).get(list_stories))
        .route("/{story_id}", get(get_story).delete(delete_story))
        .route("/{story_id}/nodes", get(list_nodes))
}
