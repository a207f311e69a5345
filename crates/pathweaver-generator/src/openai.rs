//! Chat-completions client that asks for schema-shaped JSON replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use pathweaver_core::error::DomainError;
use pathweaver_core::generator::{GenerationRequest, StructuredGenerator};

/// Connection settings of the chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// `StructuredGenerator` using the `json_schema` response format in strict
/// mode.
#[derive(Debug, Clone)]
pub struct OpenAiStructuredGenerator {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiStructuredGenerator {
    /// Creates a generator for `config`.
    #[must_use]
    pub fn new(mut config: OpenAiConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_owned();
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn request_body<'a>(&'a self, request: &'a GenerationRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.task,
                    "strict": true,
                    "schema": request.response_schema,
                },
            }),
        }
    }
}

/// Extracts the JSON document from a chat-completions reply.
fn parse_reply(response: ChatResponse) -> Result<Value, DomainError> {
    let reply = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::GenerationContract("reply has no choices".into()))?
        .message;

    if let Some(refusal) = reply.refusal {
        return Err(DomainError::GenerationContract(format!(
            "model refused: {refusal}"
        )));
    }
    let content = reply
        .content
        .ok_or_else(|| DomainError::GenerationContract("reply has no content".into()))?;
    serde_json::from_str(&content)
        .map_err(|e| DomainError::GenerationContract(format!("reply is not JSON: {e}")))
}

#[async_trait]
impl StructuredGenerator for OpenAiStructuredGenerator {
    #[instrument(skip_all, fields(task = request.task, model = %self.config.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, DomainError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| DomainError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Generation(format!(
                "generator returned {status}: {body}"
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Generation(format!("unreadable reply: {e}")))?;
        let value = parse_reply(reply)?;
        debug!("generation reply parsed");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    fn reply(content: Option<&str>) -> ChatResponse {
        serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            task: "story_outline",
            instructions: "Write an outline.".to_owned(),
            prompt: "a haunted lighthouse".to_owned(),
            response_schema: json!({ "type": "object" }),
        }
    }

    #[test]
    fn test_parse_reply_returns_content_json() {
        let value = parse_reply(reply(Some(r#"{"title":"The Keeper"}"#))).unwrap();

        assert_eq!(value["title"], "The Keeper");
    }

    #[test]
    fn test_parse_reply_rejects_non_json_content() {
        let result = parse_reply(reply(Some("Once upon a time")));

        assert!(matches!(result, Err(DomainError::GenerationContract(_))));
    }

    #[test]
    fn test_parse_reply_rejects_missing_content() {
        assert!(matches!(
            parse_reply(reply(None)),
            Err(DomainError::GenerationContract(_))
        ));
        assert!(matches!(
            parse_reply(ChatResponse { choices: vec![] }),
            Err(DomainError::GenerationContract(_))
        ));
    }

    #[test]
    fn test_parse_reply_reports_refusal() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": null, "refusal": "cannot comply" } }]
        }))
        .unwrap();

        match parse_reply(response).unwrap_err() {
            DomainError::GenerationContract(msg) => assert!(msg.contains("cannot comply")),
            other => panic!("expected GenerationContract, got {other:?}"),
        }
    }

    #[test]
    fn test_request_body_uses_strict_json_schema() {
        let generator = OpenAiStructuredGenerator::new(OpenAiConfig {
            base_url: "http://localhost/v1/".to_owned(),
            api_key: "k".to_owned(),
            model: "gpt-4o-mini".to_owned(),
        });
        let request = request();

        let body = serde_json::to_value(generator.request_body(&request)).unwrap();

        assert_eq!(generator.config.base_url, "http://localhost/v1");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "a haunted lighthouse");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "story_outline");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn completions(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        seen.lock().unwrap().push((auth, body));
        Json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "{\"title\":\"The Keeper\"}" }
            }]
        }))
    }

    async fn overloaded() -> (StatusCode, &'static str) {
        (StatusCode::TOO_MANY_REQUESTS, "slow down")
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn test_generate_posts_to_chat_completions() {
        // Arrange
        let seen = Seen::default();
        let base_url = serve(
            Router::new()
                .route("/v1/chat/completions", post(completions))
                .with_state(seen.clone()),
        )
        .await;
        let generator = OpenAiStructuredGenerator::new(OpenAiConfig {
            base_url,
            api_key: "secret".to_owned(),
            model: "gpt-4o-mini".to_owned(),
        });

        // Act
        let value = generator.generate(&request()).await.unwrap();

        // Assert
        assert_eq!(value, json!({ "title": "The Keeper" }));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_deref(), Some("Bearer secret"));
        assert_eq!(seen[0].1["messages"][0]["content"], "Write an outline.");
    }

    #[tokio::test]
    async fn test_error_status_is_generation_error() {
        let base_url = serve(Router::new().route("/v1/chat/completions", post(overloaded))).await;
        let generator = OpenAiStructuredGenerator::new(OpenAiConfig {
            base_url,
            api_key: "secret".to_owned(),
            model: "gpt-4o-mini".to_owned(),
        });

        let result = generator.generate(&request()).await;

        match result.unwrap_err() {
            DomainError::Generation(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("slow down"));
            }
            other => panic!("expected Generation, got {other:?}"),
        }
    }
}
