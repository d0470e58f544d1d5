//! Vision Client (C3, §4.3). The REDESIGN FLAGS call for polymorphism as a
//! trait rather than inheritance — `VisionProvider` is the seam, with
//! `OpenAiVision` as the concrete implementor, grounded on
//! `observing-taxonomy/src/gbif.rs`'s client-with-reused-`reqwest::Client`
//! shape.

use crate::error::{Result, VisionError};
use crate::pricing::cost_usd;
use async_trait::async_trait;
use std::time::Duration;

/// Fixed prompt text, ported from
/// `original_source/server/vision/constants.py::ANIMAL_ID_PROMPT`.
pub const ANIMAL_ID_PROMPT: &str = concat!(
    "Please identify the animal(s) in this image. ",
    "Bugs, arachnids & other invertabrits are considered animals for the purpose of this task. ",
    "Provide a specific species name if possible, or a general animal type if the species cannot be determined. ",
    "If there are multiple animals, list all of them separated by the `|` character. ",
    "Your response should be formatted in Trinomial nomenclature, formatted as the following ",
    "`genus species subspecies (common name)` if at least one animal can be identified. ",
    "If no animals can be identified, return `NO ANIMALS FOUND`",
);

pub const NO_ANIMALS_FOUND: &str = "NO ANIMALS FOUND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    Low,
    High,
    Auto,
}

impl DetailLevel {
    fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Low => "low",
            DetailLevel::High => "high",
            DetailLevel::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Identification {
    pub prediction: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub raw_response: serde_json::Value,
    pub processing_time: Duration,
}

#[async_trait]
pub trait VisionProvider: Send + Sync {
    async fn identify(
        &self,
        image_bytes: &[u8],
        model: &str,
        detail: DetailLevel,
    ) -> Result<Identification>;
}

/// OpenAI-compatible chat-completions vision endpoint.
pub struct OpenAiVision {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiVision {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1".to_string())
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build vision HTTP client");
        Self {
            http,
            api_key: api_key.into(),
            base_url,
        }
    }

    /// The token-limit parameter name varies by model family: the `gpt-5*`
    /// and `o4-mini` reasoning-style models take `max_completion_tokens`,
    /// everything else takes `max_tokens`.
    fn token_limit_param(model: &str) -> &'static str {
        if model.starts_with("gpt-5") || model.starts_with("o4") {
            "max_completion_tokens"
        } else {
            "max_tokens"
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiVision {
    async fn identify(
        &self,
        image_bytes: &[u8],
        model: &str,
        detail: DetailLevel,
    ) -> Result<Identification> {
        use base64::Engine;
        let started = std::time::Instant::now();
        let b64 = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let data_url = format!("data:image/png;base64,{b64}");

        let mut body = serde_json::json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": ANIMAL_ID_PROMPT},
                    {"type": "image_url", "image_url": {"url": data_url, "detail": detail.as_str()}},
                ],
            }],
        });
        body[Self::token_limit_param(model)] = serde_json::json!(1024);

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    VisionError::Transient(e.to_string())
                } else {
                    VisionError::Fatal(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(VisionError::Transient(format!("upstream status {status}")));
        }
        if !status.is_success() {
            return Err(VisionError::Fatal(format!("upstream status {status}")));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VisionError::Transient(e.to_string()))?;

        let prediction = raw["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| VisionError::Fatal("missing message content".to_string()))?
            .to_string();

        let input_tokens = raw["usage"]["prompt_tokens"].as_u64().unwrap_or(0);
        let output_tokens = raw["usage"]["completion_tokens"].as_u64().unwrap_or(0);

        Ok(Identification {
            cost_usd: cost_usd(model, input_tokens, output_tokens),
            prediction,
            input_tokens,
            output_tokens,
            raw_response: raw,
            processing_time: started.elapsed(),
        })
    }
}
