use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{
    config::ClientConfig,
    error::{ErrorKind, GenerationFailure, API_KEY_NOT_CONFIGURED, NO_IMAGE_DATA},
    models::{ErrorBody, GenerateImageResponse, GenerationRequest},
};

/// The single generation call the lifecycle driver issues per submission.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationFailure>;
}

/// HTTP client for `POST /api/generate-image`.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!(
                    "Could not apply request timeout of {:?} ({}); using default HTTP client",
                    config.request_timeout,
                    e
                );
                Client::new()
            });

        Self {
            client,
            endpoint: format!(
                "{}/api/generate-image",
                config.server_url.trim_end_matches('/')
            ),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationApi for ApiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                log::error!("Error generating image: {}", e);
                GenerationFailure::new(
                    ErrorKind::Transport,
                    format!("Could not reach the image server: {}", e),
                )
            })?;

        let status = response.status();
        if status.is_success() {
            return match response.json::<GenerateImageResponse>().await {
                Ok(body) if !body.image_url.is_empty() => Ok(body.image_url),
                Ok(_) | Err(_) => Err(GenerationFailure::new(ErrorKind::Provider, NO_IMAGE_DATA)),
            };
        }

        let text = response.text().await.unwrap_or_default();
        let failure = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => {
                let kind = body.kind.unwrap_or_else(|| classify(status, &body.error));
                GenerationFailure::new(kind, body.error).with_details(body.details)
            }
            Err(_) => GenerationFailure::new(
                classify(status, &text),
                format!("Image server answered {}", status),
            ),
        };
        log::error!("Error generating image: {}", failure);
        Err(failure)
    }
}

/// Best-effort kind for error bodies that do not say which kind they are.
fn classify(status: StatusCode, message: &str) -> ErrorKind {
    if status.is_client_error() {
        ErrorKind::Validation
    } else if message == API_KEY_NOT_CONFIGURED {
        ErrorKind::Configuration
    } else if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        ErrorKind::Transport
    } else {
        ErrorKind::Provider
    }
}
