pub mod client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod models;
pub mod provider;
pub mod server;

pub use client::{ApiClient, GenerationApi};
pub use config::{ClientConfig, ProviderConfig, ServerConfig};
pub use error::{ApiError, ErrorKind, GenerationFailure, ProviderError};
pub use lifecycle::{Controller, ControllerSettings, Event, LifecycleState};
pub use models::{GenerationRequest, ImageSize};
pub use provider::{ImageProvider, OpenAiImageClient};
