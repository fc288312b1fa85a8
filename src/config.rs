use std::env;
use std::time::Duration;

use crate::models::ImageSize;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_PROMPT_PREFIX: &str = "emoji of a ";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub port_probe_limit: u16,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub prompt_prefix: String,
    pub size: ImageSize,
    pub countdown_secs: u32,
    pub reveal_duration: Duration,
    pub max_blur: f32,
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let api_base = env::var("OPENAI_API_BASE").unwrap_or(defaults.api_base);
        let model = env::var("OPENAI_IMAGE_MODEL").unwrap_or(defaults.model);
        let timeout = env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        ProviderConfig {
            api_key,
            api_base,
            model,
            timeout,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            port_probe_limit: 20,
            provider: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(defaults.port);
        let port_probe_limit = env::var("PORT_PROBE_LIMIT")
            .ok()
            .and_then(|limit| limit.parse().ok())
            .unwrap_or(defaults.port_probe_limit);

        ServerConfig {
            host,
            port,
            port_probe_limit,
            provider: ProviderConfig::from_env(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_port_probe_limit(mut self, limit: u16) -> Self {
        self.port_probe_limit = limit;
        self
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: format!("http://localhost:{}", DEFAULT_PORT),
            prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            size: ImageSize::default(),
            countdown_secs: 30,
            reveal_duration: Duration::from_millis(3000),
            max_blur: 30.0,
            request_timeout: Duration::from_secs(180),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let server_url = env::var("PROMPTCAST_SERVER").unwrap_or(defaults.server_url);
        let prompt_prefix = env::var("PROMPTCAST_PREFIX").unwrap_or(defaults.prompt_prefix);
        let size = env::var("PROMPTCAST_SIZE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.size);

        ClientConfig {
            server_url,
            prompt_prefix,
            size,
            ..defaults
        }
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn with_prompt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prompt_prefix = prefix.into();
        self
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_countdown_secs(mut self, secs: u32) -> Self {
        self.countdown_secs = secs;
        self
    }

    pub fn with_reveal(mut self, duration: Duration, max_blur: f32) -> Self {
        self.reveal_duration = duration;
        self.max_blur = max_blur;
        self
    }
}
