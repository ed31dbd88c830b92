//! Image Client: hosted image generation for the screenplay cover.
//!
//! The Images API answers with either a URL (downloaded here with a plain GET)
//! or inline base64 bytes. Either way the caller receives raw image bytes.
//! Every request, including the download, is bounded by the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("image service returned no images")]
    EmptyResponse,

    #[error("image entry carried neither a url nor inline data")]
    MissingPayload,

    #[error("invalid base64 image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },
}

/// Prompt in, image bytes out. Returns one entry per generated image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<Bytes>, ImageError>;
}

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageEntry>,
}

#[derive(Debug, Deserialize)]
struct ImageEntry {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// Where the bytes of one generated image live.
#[derive(Debug, PartialEq, Eq)]
enum ImagePayload {
    Inline(Vec<u8>),
    Remote(String),
}

impl ImageEntry {
    fn into_payload(self) -> Result<ImagePayload, ImageError> {
        match (self.b64_json, self.url) {
            (Some(b64), _) => Ok(ImagePayload::Inline(STANDARD.decode(b64.trim())?)),
            (None, Some(url)) => Ok(ImagePayload::Remote(url)),
            (None, None) => Err(ImageError::MissingPayload),
        }
    }
}

/// OpenAI Images API client.
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    api_key: String,
    model: String,
    size: String,
    count: u8,
    timeout_secs: u64,
}

impl ImageClient {
    pub fn new(config: &Config) -> Result<Self, ImageError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.upstream_timeout_secs))
                .build()?,
            api_key: config.openai_api_key.clone(),
            model: config.image_model.clone(),
            size: config.image_size.clone(),
            count: config.image_count,
            timeout_secs: config.upstream_timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request_images(&self, prompt: &str) -> Result<Vec<ImageEntry>, ImageError> {
        let body = ImagesRequest {
            model: &self.model,
            prompt,
            n: self.count,
            size: &self.size,
        };

        let response = self
            .client
            .post(OPENAI_IMAGES_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Images API returned {}", status);
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ImageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        if parsed.data.is_empty() {
            return Err(ImageError::EmptyResponse);
        }
        Ok(parsed.data)
    }

    async fn download(&self, url: &str) -> Result<Bytes, ImageError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ImageError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                ImageError::Download {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(ImageError::Download {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.bytes().await.map_err(|e| ImageError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ImageError {
        if e.is_timeout() {
            ImageError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ImageError::Http(e)
        }
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<Bytes>, ImageError> {
        info!("Requesting {} image(s) from {}", self.count, self.model);
        let entries = self.request_images(prompt).await?;

        let mut images = Vec::with_capacity(entries.len());
        for entry in entries {
            let bytes = match entry.into_payload()? {
                ImagePayload::Inline(raw) => Bytes::from(raw),
                ImagePayload::Remote(url) => self.download(&url).await?,
            };
            debug!("Received image of {} bytes", bytes.len());
            images.push(bytes);
        }
        Ok(images)
    }
}
