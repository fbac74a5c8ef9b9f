// ABOUTME: Dish image generation through Gemini image models and public link publishing
// ABOUTME: Generated bytes are stored by the pipeline; hosts only decide the public URL
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::llm::{map_http_status, GEMINI_API_BASE_URL, GEMINI_API_KEY_ENV};

/// Image bytes returned by a generator
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// MIME type reported by the generator
    pub content_type: String,
}

impl Debug for GeneratedImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeneratedImage")
            .field("bytes", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Produces a picture for a dish name
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image of the dish
    async fn generate(&self, dish_name: &str) -> AppResult<GeneratedImage>;
}

/// Decides the public link for a stored image
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Publish an image and return its URL
    async fn publish(&self, blob_id: Uuid, key: &str, image: &GeneratedImage) -> AppResult<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest {
    contents: Vec<serde_json::Value>,
    generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    response_modalities: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    candidates: Vec<ImageCandidate>,
}

#[derive(Debug, Deserialize)]
struct ImageCandidate {
    content: Option<ImageContent>,
}

#[derive(Debug, Deserialize)]
struct ImageContent {
    #[serde(default)]
    parts: Vec<ImagePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Gemini `generateContent` with image output
pub struct GeminiImageGenerator {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiImageGenerator {
    /// Create a generator for an image-capable model
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            client: Client::new(),
        }
    }

    /// Create a generator using the `GEMINI_API_KEY` environment variable
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` if the key is not set.
    pub fn from_env(model: impl Into<String>) -> AppResult<Self> {
        let api_key = env::var(GEMINI_API_KEY_ENV).map_err(|_| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!("{GEMINI_API_KEY_ENV} environment variable not set"),
            )
        })?;
        Ok(Self::new(api_key, model))
    }

    fn prompt(dish_name: &str) -> String {
        format!("Create a picture of {dish_name}")
    }

    fn decode_first_image(response: &ImageResponse) -> AppResult<GeneratedImage> {
        let inline = response
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.inline_data.as_ref())
            .ok_or_else(|| {
                AppError::external_service("Gemini Images", "response contained no image data")
            })?;

        let bytes = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
            AppError::external_service("Gemini Images", format!("invalid base64 image: {e}"))
        })?;

        Ok(GeneratedImage {
            bytes,
            content_type: inline.mime_type.clone(),
        })
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn generate(&self, dish_name: &str) -> AppResult<GeneratedImage> {
        let url = format!(
            "{GEMINI_API_BASE_URL}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let request = ImageRequest {
            contents: vec![json!({ "parts": [{ "text": Self::prompt(dish_name) }] })],
            generation_config: ImageGenerationConfig {
                response_modalities: ["TEXT", "IMAGE"],
            },
        };

        debug!("Requesting dish image");
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = %status, "Gemini image API error");
            return Err(map_http_status("Gemini Images", status, &body));
        }

        let parsed: ImageResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::external_service("Gemini Images", format!("Failed to parse response: {e}"))
        })?;
        Self::decode_first_image(&parsed)
    }
}

impl Debug for GeminiImageGenerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiImageGenerator")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Generator used when image generation is disabled or unconfigured
#[derive(Debug, Clone)]
pub struct UnavailableImageGenerator {
    reason: String,
}

impl UnavailableImageGenerator {
    /// Generator that always fails with `reason`
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ImageGenerator for UnavailableImageGenerator {
    async fn generate(&self, _dish_name: &str) -> AppResult<GeneratedImage> {
        Err(AppError::new(ErrorCode::ConfigMissing, self.reason.clone()))
    }
}

/// Serves images from this server's `/images/{id}` route
#[derive(Debug, Clone)]
pub struct SelfHostedImages {
    public_base_url: String,
}

impl SelfHostedImages {
    /// Host rooted at the server's public base URL
    #[must_use]
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Public URL of a stored image
    #[must_use]
    pub fn url_for(&self, blob_id: Uuid) -> String {
        format!("{}/images/{blob_id}", self.public_base_url)
    }
}

#[async_trait]
impl ImageHost for SelfHostedImages {
    async fn publish(&self, blob_id: Uuid, _key: &str, _image: &GeneratedImage) -> AppResult<String> {
        Ok(self.url_for(blob_id))
    }
}
