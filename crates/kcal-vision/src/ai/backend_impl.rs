//! OpenAI chat-completions implementation of `VisionBackend`
//!
//! One request per call, no retries. The whole exchange (connect, send,
//! body read) runs under a single deadline; dropping the returned future
//! aborts the in-flight request.

use super::VisionBackend;
use crate::AnalyzerConfig;
use async_trait::async_trait;
use kcal_types::{Error, ImageReference, Result};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;

pub const BACKEND_NAME: &str = "OpenAI";

pub struct OpenAiBackend {
    config: AnalyzerConfig,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| Error::UpstreamUnavailable(format!("HTTP client setup failed: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn request_body(&self, prompt: &str, image: &ImageReference) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": image.as_str(), "detail": self.config.image_detail }
                    }
                ]
            }],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" }
        })
    }

    async fn exchange(&self, api_key: &str, body: &serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::UpstreamError {
                status: None,
                message: format!("OpenAI request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamError {
                status: Some(status.as_u16()),
                message: format!("OpenAI API error: {} - {}", status.as_u16(), text),
            });
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| Error::UpstreamError {
            status: Some(status.as_u16()),
            message: format!("Malformed completion envelope: {e}"),
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::UpstreamError {
                status: Some(status.as_u16()),
                message: "Completion contained no message content".to_string(),
            })
    }
}

#[async_trait]
impl VisionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn send_prompt(&self, prompt: &str, image: &ImageReference) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::UpstreamUnavailable("OPENAI_API_KEY not configured".to_string()))?;

        let body = self.request_body(prompt, image);
        debug!(
            "Calling {} model={} image={}",
            self.config.endpoint,
            self.config.model,
            if image.is_data_url() { "inline" } else { image.as_str() }
        );

        match tokio::time::timeout(self.config.timeout, self.exchange(api_key, &body)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Vision call exceeded {:?}", self.config.timeout);
                Err(Error::UpstreamError {
                    status: None,
                    message: format!(
                        "OpenAI request timed out after {}ms",
                        self.config.timeout.as_millis()
                    ),
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
