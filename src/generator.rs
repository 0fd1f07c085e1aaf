use crate::config::GeneratorConfig;
use crate::error::{RagError, Result};
use crate::prompt::ChatMessage;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

/// Remote language model answering a rendered prompt
#[async_trait]
pub trait Generator: Send + Sync {
    fn model(&self) -> &str;

    /// Submit the prompt and return the plain-text answer
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for Groq's OpenAI-compatible chat completions API
#[derive(Clone)]
pub struct GroqClient {
    config: GeneratorConfig,
    client: reqwest::Client,
}

impl GroqClient {
    pub fn new(config: GeneratorConfig, client: reqwest::Client) -> Self {
        GroqClient { config, client }
    }
}

#[async_trait]
impl Generator for GroqClient {
    fn model(&self) -> &str {
        self.config.model
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        debug!("Requesting completion from {}", self.config.model);
        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::GenerationFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::GenerationFailure(format!(
                "API request failed: {} {}",
                status, error_text
            )));
        }

        let response_data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RagError::GenerationFailure(format!("Malformed response: {}", e)))?;

        parse_output(response_data)
    }
}

/// Strip the completion envelope down to the answer text
fn parse_output(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| RagError::GenerationFailure("No response generated".to_string()))
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}
