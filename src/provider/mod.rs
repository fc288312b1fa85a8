pub mod openai_client;

use crate::{error::ProviderError, models::ImageSize};
use async_trait::async_trait;

pub use openai_client::OpenAiImageClient;

/// The external image generation capability.
///
/// Implementations make exactly one outbound call per invocation and never retry.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<String, ProviderError>;
}
