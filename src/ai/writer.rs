use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use crate::config::WriterConfig;

/// Client for an OpenAI-compatible chat-completions endpoint that turns a
/// recap prompt into a markdown post.
pub struct PostWriter {
    client: Client,
    config: WriterConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Writer API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Writer API returned no content")]
    EmptyResponse,
}

impl PostWriter {
    pub fn new(config: WriterConfig, api_key: String) -> Result<Self, WriterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    pub async fn generate_post(&self, prompt: &str) -> Result<String, WriterError> {
        info!("Requesting post from {} ({})", self.config.api_url, self.config.model);

        let response = self.client
            .post(&self.config.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Writer API error {}: {}", status, body);
            return Err(WriterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = first_choice_content(parsed)?;

        info!("Received post ({} chars)", content.len());
        Ok(content)
    }
}

fn first_choice_content(response: ChatResponse) -> Result<String, WriterError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(WriterError::EmptyResponse)
}
