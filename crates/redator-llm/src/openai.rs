//! OpenAI-compatible chat completions provider (OpenRouter and friends)

use crate::provider::{LlmError, LlmProvider, LlmResult};
use crate::types::{LlmMessage, LlmRequest, LlmResponse, Usage};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Error bodies are cut to this many chars before they reach logs or callers.
const MAX_ERROR_BODY_CHARS: usize = 300;

pub struct OpenAiCompatProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiCompatProvider {
    /// `base_url` is the API root, e.g. `https://openrouter.ai/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: None,
            base_url: base_url.into(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str { "openai-compat" }

    async fn complete(&self, request: LlmRequest) -> LlmResult<LlmResponse> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(LlmMessage::system(system.clone()));
        }
        messages.extend(request.messages.iter().cloned());

        let body = ChatRequest {
            model: &request.model,
            messages: &messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!("Chat completion request: model={} messages={}", body.model, messages.len());

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header("X-Title", "redator");
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = truncate(&response.text().await.unwrap_or_default());
            error!("Chat completion error {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthFailed(error_text),
                429 => LlmError::RateLimited { retry_after_ms: 60000 },
                _ => LlmError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        let raw = response.text().await?;
        parse_chat_response(&raw)
    }
}

fn parse_chat_response(raw: &str) -> LlmResult<LlmResponse> {
    let parsed: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, truncate(raw))))?;

    // Some gateways report upstream failures with a 200 and an error object.
    if let Some(err) = parsed.error {
        return Err(LlmError::RequestFailed(truncate(&err.message)));
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("no choices in response".into()))?;

    let text = choice
        .message
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| LlmError::InvalidResponse("empty completion".into()))?;

    Ok(LlmResponse {
        text,
        model: parsed.model,
        finish_reason: choice.finish_reason,
        usage: parsed.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    })
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_ERROR_BODY_CHARS {
        s.to_string()
    } else {
        let cut: String = s.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", cut)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    model: Option<String>,
    usage: Option<ChatUsage>,
    error: Option<ChatErrorBody>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ChatErrorBody {
    message: String,
}
