use crate::{
    config::ProviderConfig,
    error::ProviderError,
    models::{ImageSize, OpenAiImageRequest, OpenAiImageResponse},
    provider::ImageProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

const GENERATIONS_PATH: &str = "/v1/images/generations";

#[derive(Clone)]
pub struct OpenAiImageClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl OpenAiImageClient {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!(
                    "⚠️  Could not apply provider timeout of {:?} ({}); using default HTTP client",
                    config.timeout,
                    e
                );
                Client::new()
            });

        Self {
            client,
            api_key: config.api_key,
            endpoint: format!(
                "{}{}",
                config.api_base.trim_end_matches('/'),
                GENERATIONS_PATH
            ),
            model: config.model,
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageClient {
    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential)?;

        let payload = OpenAiImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: size.as_str(),
        };

        log::debug!("Requesting {} image from {}", size, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Unreachable(describe_transport_error(&e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: OpenAiImageResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Rejected {
                status: status.as_u16(),
                detail: Value::String(format!("malformed provider response: {}", e)),
            })?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResult)?;
        if let Some(revised) = &first.revised_prompt {
            log::debug!("Provider revised prompt to: {}", revised);
        }
        first
            .url
            .filter(|url| !url.is_empty())
            .ok_or(ProviderError::EmptyResult)
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> OpenAiImageClient {
        let mut config = ProviderConfig::new().with_api_base(server.uri());
        config.api_key = api_key.map(String::from);
        OpenAiImageClient::new(config)
    }

    #[tokio::test]
    async fn returns_first_image_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "dall-e-3",
                "prompt": "a fox",
                "n": 1,
                "size": "1024x1024"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1,
                "data": [
                    {"url": "https://x/y.png", "revised_prompt": "a red fox"},
                    {"url": "https://x/z.png"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        let url = client.generate("a fox", ImageSize::Square1024).await.unwrap();
        assert_eq!(url, "https://x/y.png");
    }

    #[tokio::test]
    async fn missing_credential_fails_without_calling_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .generate("a fox", ImageSize::Square1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential));
    }

    #[tokio::test]
    async fn empty_data_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        let err = client
            .generate("a fox", ImageSize::Square1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResult));
    }

    #[tokio::test]
    async fn entry_with_blank_url_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"url": ""}]})))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        let err = client
            .generate("a fox", ImageSize::Square1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResult));
        assert_eq!(err.public_message(), "No image data returned from API");
    }

    #[tokio::test]
    async fn configured_timeout_bounds_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"url": "https://x/y.png"}]}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = ProviderConfig::new()
            .with_api_key("sk-test")
            .with_api_base(server.uri())
            .with_timeout(Duration::from_millis(200));
        let err = OpenAiImageClient::new(config)
            .generate("a fox", ImageSize::Square1024)
            .await
            .unwrap_err();
        match err {
            ProviderError::Unreachable(reason) => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn error_payload_is_kept_as_detail() {
        let server = MockServer::start().await;
        let payload = json!({
            "error": {
                "message": "Your request was rejected by the safety system.",
                "type": "invalid_request_error",
                "code": "content_policy_violation"
            }
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(payload.clone()))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        match client.generate("a fox", ImageSize::Square1024).await {
            Err(ProviderError::Rejected { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail, payload);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("sk-test"));
        match client.generate("a fox", ImageSize::Square512).await {
            Err(ProviderError::Rejected { status, detail }) => {
                assert_eq!(status, 502);
                assert_eq!(detail, Value::String("bad gateway".into()));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ProviderConfig::new()
            .with_api_key("sk-test")
            .with_api_base(format!("http://127.0.0.1:{}", port));
        let client = OpenAiImageClient::new(config);
        let err = client
            .generate("a fox", ImageSize::Square1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unreachable(_)));
        assert!(!err.details().unwrap().to_string().contains("sk-test"));
    }
}
