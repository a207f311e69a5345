//! `AssetRenderer` backed by a JSON-over-HTTP media service.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use pathweaver_core::assets::{AssetKind, AssetRenderer, AssetRequest};
use pathweaver_core::error::DomainError;

/// Body posted for every render request.
#[derive(Debug, Serialize)]
struct RenderBody<'a> {
    prompt: &'a str,
    story_id: Uuid,
    node_id: String,
}

/// Posts render requests to the image or audio endpoint of a media service.
/// The service answers once the job is queued; the response body is ignored.
#[derive(Debug, Clone)]
pub struct HttpAssetRenderer {
    client: reqwest::Client,
    image_endpoint: String,
    audio_endpoint: String,
}

impl HttpAssetRenderer {
    /// Creates a renderer posting images to `image_endpoint` and audio to
    /// `audio_endpoint`.
    #[must_use]
    pub fn new(image_endpoint: impl Into<String>, audio_endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            image_endpoint: image_endpoint.into(),
            audio_endpoint: audio_endpoint.into(),
        }
    }

    fn endpoint(&self, kind: AssetKind) -> &str {
        match kind {
            AssetKind::Image => &self.image_endpoint,
            AssetKind::Audio => &self.audio_endpoint,
        }
    }
}

#[async_trait]
impl AssetRenderer for HttpAssetRenderer {
    async fn render(&self, request: &AssetRequest) -> Result<(), DomainError> {
        let url = self.endpoint(request.key.kind());
        let body = RenderBody {
            prompt: &request.prompt,
            story_id: request.key.story_id,
            node_id: request.key.suffix(),
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::Infrastructure(format!("render request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Infrastructure(format!(
                "renderer returned {status} for {}",
                request.key
            )));
        }

        debug!(key = %request.key, %url, "render request accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use pathweaver_core::assets::AssetKey;
    use serde_json::Value;

    use super::*;

    type Received = Arc<Mutex<Vec<(&'static str, Value)>>>;

    async fn image(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
        received.lock().unwrap().push(("image", body));
        StatusCode::ACCEPTED
    }

    async fn audio(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
        received.lock().unwrap().push(("audio", body));
        StatusCode::ACCEPTED
    }

    async fn broken() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    /// Serves a stub media service on an ephemeral port and returns its base URL.
    async fn serve(received: Received) -> String {
        let app = Router::new()
            .route("/image", post(image))
            .route("/audio", post(audio))
            .route("/broken", post(broken))
            .with_state(received);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_node_image_is_posted_to_image_endpoint() {
        // Arrange
        let received = Received::default();
        let base = serve(received.clone()).await;
        let renderer = HttpAssetRenderer::new(format!("{base}/image"), format!("{base}/audio"));
        let story_id = Uuid::new_v4();
        let node_id = Uuid::new_v4();

        // Act
        renderer
            .render(&AssetRequest {
                key: AssetKey::node(story_id, node_id),
                prompt: "a lighthouse at dusk".to_owned(),
            })
            .await
            .unwrap();

        // Assert
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let (endpoint, body) = &received[0];
        assert_eq!(*endpoint, "image");
        assert_eq!(body["prompt"], "a lighthouse at dusk");
        assert_eq!(body["story_id"], story_id.to_string());
        assert_eq!(body["node_id"], node_id.to_string());
    }

    #[tokio::test]
    async fn test_theme_is_posted_to_audio_endpoint() {
        let received = Received::default();
        let base = serve(received.clone()).await;
        let renderer = HttpAssetRenderer::new(format!("{base}/image"), format!("{base}/audio"));

        renderer
            .render(&AssetRequest {
                key: AssetKey::theme(Uuid::new_v4()),
                prompt: "slow synth".to_owned(),
            })
            .await
            .unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received[0].0, "audio");
        assert_eq!(received[0].1["node_id"], "theme");
    }

    #[tokio::test]
    async fn test_error_status_is_infrastructure_error() {
        let base = serve(Received::default()).await;
        let renderer = HttpAssetRenderer::new(format!("{base}/broken"), format!("{base}/broken"));

        let result = renderer
            .render(&AssetRequest {
                key: AssetKey::banner(Uuid::new_v4()),
                prompt: "cover".to_owned(),
            })
            .await;

        match result.unwrap_err() {
            DomainError::Infrastructure(msg) => assert!(msg.contains("503")),
            other => panic!("expected Infrastructure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_infrastructure_error() {
        let renderer = HttpAssetRenderer::new("http://127.0.0.1:1/image", "http://127.0.0.1:1/audio");

        let result = renderer
            .render(&AssetRequest {
                key: AssetKey::banner(Uuid::new_v4()),
                prompt: "cover".to_owned(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
