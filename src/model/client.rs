//! HTTP client for the hosted model endpoint
//!
//! One OpenAI-compatible endpoint serves all three capabilities: chat
//! completions (with tools), audio transcription, and vision. The default
//! base URL is the Groq API; any compatible endpoint works.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::{Config, ModelConfig};

use super::provider::{
    ChatMessage, ChatRequest, ContentPart, ImageUrl, MessageContent, ModelProvider,
};

/// Language hint sent with every transcription request.
const TRANSCRIPTION_LANGUAGE: &str = "en";

pub struct HostedModelClient {
    http: Client,
    base_url: String,
    api_key: String,
    models: ModelConfig,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HostedModelClient {
    /// Build a client from config; fails if no API key is resolvable.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .resolve_api_key()
            .context("No API key configured (set api_key in config.yml or GROQ_API_KEY)")?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            models: config.models.clone(),
        })
    }

    /// Model id used for plain chat turns.
    pub fn chat_model(&self) -> &str {
        &self.models.chat
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Chat completion request to {} ({})", url, request.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to reach hosted model endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Hosted model error: {} - {}", status, body);
            anyhow::bail!("Hosted model error: {} - {}", status, body);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .context("Hosted model returned no choices")
    }
}

#[async_trait]
impl ModelProvider for HostedModelClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatMessage> {
        self.post_chat(&request).await
    }

    async fn transcribe(&self, audio: &[u8], filename: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        debug!("Transcription request to {} ({} bytes)", url, audio.len());

        let file_part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.models.transcription.clone())
            .text("language", TRANSCRIPTION_LANGUAGE)
            .text("prompt", prompt.to_string())
            .text("temperature", "0")
            .text("response_format", "json");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach transcription endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Transcription error: {} - {}", status, body);
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        Ok(transcription.text)
    }

    async fn describe(&self, image: &[u8], mime_type: &str, instruction: &str) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let data_url = format!("data:{};base64,{}", mime_type, encoded);

        let request = ChatRequest {
            model: self.models.vision.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: instruction.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ])),
                tool_calls: None,
                tool_call_id: None,
            }],
            tools: None,
            temperature: Some(0.5),
            max_completion_tokens: Some(1024),
        };

        let message = self.post_chat(&request).await?;
        Ok(message.text())
    }
}
