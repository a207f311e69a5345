//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pathweaver_api::state::AppState;
use pathweaver_story::application::completion_gate::PollingCompletionGate;
use pathweaver_story::application::orchestrator::{StoryOrchestrator, StoryPorts};
use pathweaver_story::application::prompts::{ENDING_TASK, OUTLINE_TASK, SCENE_TASK};
use pathweaver_story::domain::settings::{GenerationSettings, IncompleteAssetsPolicy};
use pathweaver_test_support::{
    FixedClock, InMemoryStoryRepository, RecordingAssetRenderer, RecordingSleeper,
    ScriptedAssetInventory, ScriptedGenerator, ScriptedReply, SequentialIdGenerator,
};
use serde_json::json;
use tower::ServiceExt;

/// A generator producing a binary tree: two choices at every continuation.
pub fn binary_tree_generator() -> ScriptedGenerator {
    ScriptedGenerator::new(|request, call| match request.task {
        OUTLINE_TASK => ScriptedReply::Json(json!({
            "title": "The Keeper",
            "description": "Knocking echoes from beneath the lighthouse.",
            "banner_image_prompt": "Pixel-art lighthouse in a storm",
            "theme_audio_prompt": "Slow synth swells",
        })),
        SCENE_TASK => ScriptedReply::Json(json!({
            "title": format!("Scene {call}"),
            "narrative": format!("The stairs creak ({call})."),
            "image_prompt": format!("spiral stairs {call}"),
            "is_terminal": false,
            "choices": [
                { "label": "Go down", "description": "Follow the knocking." },
                { "label": "Go up", "description": "Climb to the lamp." },
            ],
        })),
        ENDING_TASK => ScriptedReply::Json(json!({
            "title": format!("Ending {call}"),
            "narrative": "Dawn breaks over the sea.",
            "image_prompt": "sunrise over calm water",
        })),
        other => ScriptedReply::Fail(pathweaver_core::error::DomainError::Validation(format!(
            "unexpected task {other}"
        ))),
    })
}

/// Build the full app router over in-memory collaborators. Stories are
/// finalized without waiting for assets.
pub fn build_test_app(repository: Arc<InMemoryStoryRepository>) -> Router {
    let settings = GenerationSettings {
        max_depth: 2,
        max_concurrent: 4,
        generation_timeout: Duration::from_secs(5),
        dispatch_timeout: Duration::from_millis(100),
        poll_interval: Duration::from_secs(1),
        max_poll_iterations: 0,
        incomplete_assets: IncompleteAssetsPolicy::Finalize,
    };
    let gate = PollingCompletionGate::new(
        Arc::new(ScriptedAssetInventory::fixed(Vec::<String>::new())),
        Arc::new(RecordingSleeper::new()),
        settings.poll_interval,
        settings.max_poll_iterations,
    );
    let ports = StoryPorts {
        generator: Arc::new(binary_tree_generator()),
        repository: repository.clone(),
        renderer: Arc::new(RecordingAssetRenderer::accepting()),
        completion_gate: Arc::new(gate),
        clock: Arc::new(FixedClock(
            chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
        )),
        ids: Arc::new(Mutex::new(SequentialIdGenerator::default())),
    };
    let orchestrator = Arc::new(StoryOrchestrator::new(ports, settings));

    pathweaver_api::app(AppState::new(repository, orchestrator))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a DELETE request and return the response status.
pub async fn delete(app: Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    app.oneshot(request).await.unwrap().status()
}

/// Poll a story until it leaves `PROCESSING`, returning its final view.
pub async fn wait_for_terminal_status(app: &Router, story_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let (status, json) = get_json(app.clone(), &format!("/api/v1/stories/{story_id}")).await;
        assert_eq!(status, StatusCode::OK);
        if json["status"] != "PROCESSING" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("story {story_id} never finished");
}
