use actix_web::{error::JsonPayloadError, get, post, web, HttpRequest, HttpResponse};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{ApiError, Result, PROMPT_REQUIRED},
    logger,
    models::{
        GenerateImageBody, GenerateImageResponse, ImageSize, StatusResponse, UnsupportedSize,
    },
    server::AppState,
};

pub const STATUS_MESSAGE: &str = "Server is running";

#[post("/api/generate-image")]
pub async fn generate_image(
    state: web::Data<AppState>,
    body: web::Json<GenerateImageBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let request_id = Uuid::new_v4();

    let prompt = match body.prompt {
        Some(Value::String(prompt)) if !prompt.trim().is_empty() => prompt,
        _ => {
            log::warn!("[req:{}] Rejected request without a prompt", request_id);
            return Err(ApiError::validation(PROMPT_REQUIRED));
        }
    };

    let size = match body.size {
        None => Ok(ImageSize::default()),
        Some(Value::String(raw)) => raw.parse::<ImageSize>(),
        Some(other) => Err(UnsupportedSize(other.to_string())),
    }
    .map_err(|e| {
        log::warn!("[req:{}] {}", request_id, e);
        ApiError::validation(e.to_string())
    })?;

    log::info!(
        "[req:{}] Processing image generation request for prompt: \"{}\"",
        request_id,
        logger::truncate_prompt(&prompt)
    );

    let result = {
        let _timer = logger::timer(format!("[req:{}] provider call", request_id));
        state.provider.generate(&prompt, size).await
    };

    match result {
        Ok(image_url) => {
            log::info!("[req:{}] Image generated successfully", request_id);
            Ok(HttpResponse::Ok().json(GenerateImageResponse { image_url }))
        }
        Err(err) => {
            log::error!(
                "[req:{}] Error generating image ({}): {}",
                request_id,
                err.kind(),
                err
            );
            if let Some(details) = err.details() {
                log::debug!("[req:{}] Provider details: {}", request_id, details);
            }
            Err(err.into())
        }
    }
}

#[get("/api/status")]
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: STATUS_MESSAGE.to_string(),
        port: state.port,
    })
}

/// Turns an unreadable body into the endpoint's own 400 shape. Field types are
/// checked in the handler.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected malformed request body: {}", err);
    ApiError::Validation {
        message: PROMPT_REQUIRED.to_string(),
        details: Some(Value::String(err.to_string())),
    }
    .into()
}
