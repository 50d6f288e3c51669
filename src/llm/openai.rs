//! OpenAI-compatible HTTP client for chat completions and image generation.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;

use super::{
    CompletionRequest, ImageGenerator, ImageRequest, LlmError, LlmFuture, LlmResult,
    TextGenerator,
};

/// Chat completions path relative to the base URL.
const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
/// Image generations path relative to the base URL.
const IMAGE_GENERATIONS_PATH: &str = "images/generations";

/// Async client for an OpenAI-compatible API.
///
/// Built once at startup and shared; the request timeout configured here
/// bounds every call.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        url::Url::parse(&config.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> LlmResult<R>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::ApiKeyRequired("OpenAI".to_string()))?;

        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::AccessDenied(format!(
                "{path} rejected the API key ({status})"
            )));
        }
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))
    }
}

impl TextGenerator for OpenAiClient {
    fn complete(&self, request: CompletionRequest) -> LlmFuture<'_, LlmResult<String>> {
        Box::pin(async move {
            let body = ChatCompletionBody {
                model: &request.model,
                messages: [
                    ChatMessageBody {
                        role: "system",
                        content: &request.system,
                    },
                    ChatMessageBody {
                        role: "user",
                        content: &request.user,
                    },
                ],
                temperature: request.temperature,
            };

            debug!(model = %request.model, "Requesting chat completion");
            let response: ChatCompletionResponse =
                self.post_json(CHAT_COMPLETIONS_PATH, &body).await?;

            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .map(|content| content.trim().to_string())
                .filter(|content| !content.is_empty())
                .ok_or_else(|| LlmError::MalformedResponse("completion has no content".to_string()))
        })
    }
}

impl ImageGenerator for OpenAiClient {
    fn generate_images(&self, request: ImageRequest) -> LlmFuture<'_, LlmResult<Vec<String>>> {
        Box::pin(async move {
            let body = ImageGenerationBody {
                model: &request.model,
                prompt: &request.prompt,
                n: request.count,
                size: &request.size,
            };

            debug!(model = %request.model, size = %request.size, "Requesting image generation");
            let response: ImageGenerationResponse =
                self.post_json(IMAGE_GENERATIONS_PATH, &body).await?;

            Ok(response
                .data
                .into_iter()
                .filter_map(|image| image.url)
                .collect())
        })
    }
}

// OpenAI request/response structures

#[derive(Serialize)]
struct ChatMessageBody<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessageBody<'a>; 2],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageGenerationBody<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: &str) -> OpenAiClient {
        let config = LlmConfig::default()
            .with_base_url(base_url)
            .with_api_key("sk-test");
        OpenAiClient::new(&config).unwrap()
    }

    fn completion_request() -> CompletionRequest {
        CompletionRequest {
            system: "system".to_string(),
            user: "user".to_string(),
            model: "gpt-4".to_string(),
            temperature: 1.0,
        }
    }

    #[tokio::test]
    async fn test_completion_returns_trimmed_content() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer sk-test")
                );
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "user");
                Json(json!({
                    "choices": [{"message": {"content": "  A fox is napping in a barn.\n"}}]
                }))
            }),
        );
        let base = spawn_stub(router).await;

        let text = client_for(&base).complete(completion_request()).await.unwrap();
        assert_eq!(text, "A fox is napping in a barn.");
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn_stub(router).await;

        let err = client_for(&base)
            .complete(completion_request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Status(500)));
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (AxumStatus::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn_stub(router).await;

        let err = client_for(&base)
            .complete(completion_request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[tokio::test]
    async fn test_empty_choices_are_malformed() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let base = spawn_stub(router).await;

        let err = client_for(&base)
            .complete(completion_request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"choices": []}))
            }),
        );
        let base = spawn_stub(router).await;

        let config = LlmConfig::default()
            .with_base_url(&base)
            .with_api_key("sk-test")
            .with_timeout(Duration::from_millis(200));
        let client = OpenAiClient::new(&config).unwrap();

        let err = client.complete(completion_request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let config = LlmConfig::default().with_base_url("http://127.0.0.1:9");
        let client = OpenAiClient::new(&config).unwrap();
        let err = client.complete(completion_request()).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyRequired(_)));
    }

    #[tokio::test]
    async fn test_image_generation_returns_urls() {
        let router = Router::new().route(
            "/images/generations",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["n"], 1);
                assert_eq!(body["size"], "512x512");
                Json(json!({"data": [{"url": "https://img.example/1.png"}]}))
            }),
        );
        let base = spawn_stub(router).await;

        let urls = client_for(&base)
            .generate_images(ImageRequest {
                prompt: "A fox".to_string(),
                model: "dall-e-2".to_string(),
                count: 1,
                size: "512x512".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(urls, vec!["https://img.example/1.png".to_string()]);
    }

    #[test]
    fn test_invalid_base_url() {
        let config = LlmConfig::default().with_base_url("not a url");
        assert!(matches!(
            OpenAiClient::new(&config),
            Err(LlmError::InvalidUrl(_))
        ));
    }
}
