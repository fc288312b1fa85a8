use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::ErrorKind;

pub const DEFAULT_SIZE: ImageSize = ImageSize::Square1024;

/// Output dimensions the provider accepts, rendered on the wire as `"WxH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "256x256")]
    Square256,
    #[serde(rename = "512x512")]
    Square512,
    #[serde(rename = "1024x1024")]
    Square1024,
    #[serde(rename = "1792x1024")]
    Landscape1792,
    #[serde(rename = "1024x1792")]
    Portrait1792,
}

impl ImageSize {
    pub const ALL: [ImageSize; 5] = [
        ImageSize::Square256,
        ImageSize::Square512,
        ImageSize::Square1024,
        ImageSize::Landscape1792,
        ImageSize::Portrait1792,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square256 => "256x256",
            ImageSize::Square512 => "512x512",
            ImageSize::Square1024 => "1024x1024",
            ImageSize::Landscape1792 => "1792x1024",
            ImageSize::Portrait1792 => "1024x1792",
        }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        DEFAULT_SIZE
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedSize(pub String);

impl fmt::Display for UnsupportedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allowed: Vec<&str> = ImageSize::ALL.iter().map(|s| s.as_str()).collect();
        write!(
            f,
            "Unsupported size \"{}\" (expected one of {})",
            self.0,
            allowed.join(", ")
        )
    }
}

impl FromStr for ImageSize {
    type Err = UnsupportedSize;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ImageSize::ALL
            .iter()
            .copied()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| UnsupportedSize(s.to_string()))
    }
}

/// A validated generation request. Built at submission time and consumed by the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
}

impl GenerationRequest {
    /// Returns `None` when the prompt is empty or whitespace.
    pub fn new(prompt: impl Into<String>, size: ImageSize) -> Option<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return None;
        }
        Some(Self { prompt, size })
    }
}

/// Inbound body of `POST /api/generate-image`. Fields are kept as raw JSON so the
/// handler can answer a missing or mistyped field with that field's own message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateImageBody {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub size: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_parse_from_wire_form() {
        assert_eq!("1024x1024".parse::<ImageSize>(), Ok(ImageSize::Square1024));
        assert_eq!("1792x1024".parse::<ImageSize>(), Ok(ImageSize::Landscape1792));
        assert!("800x600".parse::<ImageSize>().is_err());
        assert!(" 512x512 ".parse::<ImageSize>().is_err());
        assert!("512X512".parse::<ImageSize>().is_err());
        assert_eq!(ImageSize::default().as_str(), "1024x1024");
    }

    #[test]
    fn unsupported_size_lists_allowed_values() {
        let err = "9x9".parse::<ImageSize>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("9x9"));
        assert!(message.contains("1024x1792"));
    }

    #[test]
    fn blank_prompt_is_not_a_request() {
        assert!(GenerationRequest::new("", ImageSize::Square1024).is_none());
        assert!(GenerationRequest::new("   ", ImageSize::Square1024).is_none());
        assert!(GenerationRequest::new("a fox", ImageSize::Square1024).is_some());
    }

    #[test]
    fn request_serializes_size_as_string() {
        let request = GenerationRequest::new("a fox", ImageSize::Square512).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["size"], "512x512");
        assert_eq!(json["prompt"], "a fox");
    }

    #[test]
    fn response_uses_camel_case() {
        let json = serde_json::to_value(GenerateImageResponse {
            image_url: "https://x/y.png".into(),
        })
        .unwrap();
        assert_eq!(json["imageUrl"], "https://x/y.png");
    }
}
