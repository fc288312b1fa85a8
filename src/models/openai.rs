use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct OpenAiImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u32,
    pub size: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiImageResponse {
    #[serde(default)]
    pub data: Vec<OpenAiImage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiImage {
    pub url: Option<String>,
    pub revised_prompt: Option<String>,
}
