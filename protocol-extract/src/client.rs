//! The generation-service boundary.
//!
//! [`GenerationClient`] is the only seam between the extraction core and the
//! hosted model. [`OpenRouterClient`] speaks the OpenAI-compatible
//! chat-completions dialect; [`MockGenerationClient`] stands in for it in
//! tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{ExtractError, Result};

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

/// One piece of user content sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Document { mime_type: String, data: Vec<u8> },
}

/// A single request: a fixed system instruction plus user content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub parts: Vec<Part>,
}

impl GenerationRequest {
    pub fn text(system_instruction: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A binary document followed by the instruction that applies to it.
    pub fn document(
        system_instruction: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            parts: vec![
                Part::Document {
                    mime_type: mime_type.into(),
                    data,
                },
                Part::Text(instruction.into()),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    /// `None` when the model returned no text content.
    pub text: Option<String>,
}

impl GenerationResponse {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Hosted text/document generation (allows mocking).
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;
}

/// Connection settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl GenerationConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Reads `OPENROUTER_API_KEY` (required), `OPENROUTER_MODEL`,
    /// `OPENROUTER_BASE_URL` and `GENERATION_MAX_TOKENS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GenerationConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("OPENROUTER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ExtractError::Config("OPENROUTER_API_KEY environment variable not set".to_string())
            })?;

        let mut config = Self::new(api_key);
        if let Some(model) = lookup("OPENROUTER_MODEL") {
            config = config.with_model(model);
        }
        if let Some(base_url) = lookup("OPENROUTER_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Some(raw) = lookup("GENERATION_MAX_TOKENS") {
            let max_tokens = raw.parse::<u32>().map_err(|_| {
                ExtractError::Config(format!("GENERATION_MAX_TOKENS is not a number: {raw}"))
            })?;
            config.max_tokens = max_tokens;
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Calls an OpenRouter (or any OpenAI-compatible) chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: Client,
    config: GenerationConfig,
}

impl OpenRouterClient {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_payload(&self, request: &GenerationRequest) -> Value {
        let content: Vec<Value> = request.parts.iter().map(content_item).collect();

        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": request.system_instruction },
                { "role": "user", "content": content }
            ],
            "max_tokens": self.config.max_tokens
        })
    }
}

fn content_item(part: &Part) -> Value {
    match part {
        Part::Text(text) => json!({ "type": "text", "text": text }),
        Part::Document { mime_type, data } => json!({
            "type": "file",
            "file": {
                "filename": "protocol.pdf",
                "file_data": format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
            }
        }),
    }
}

/// Pull the assistant text out of a chat-completions response body.
fn response_text(body: &Value) -> Option<String> {
    let text = match &body["choices"][0]["message"]["content"] {
        Value::String(text) => Some(text.clone()),
        // Some providers return content as a list of typed parts.
        Value::Array(parts) => {
            let joined: String = parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<Vec<_>>()
                .join("");
            Some(joined)
        }
        _ => None,
    };
    text.filter(|text| !text.is_empty())
}

#[async_trait]
impl GenerationClient for OpenRouterClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let payload = self.build_payload(&request);
        let url = format!("{}/chat/completions", self.config.base_url);

        debug!(model = %self.config.model, parts = request.parts.len(), "sending generation request");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExtractError::Transport(format!(
                "LLM API request failed: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let text = response_text(&body);

        info!(
            model = %self.config.model,
            chars = text.as_ref().map_or(0, String::len),
            "generation request completed"
        );

        Ok(GenerationResponse { text })
    }
}

/// Mock client for testing: returns a canned response or a canned failure
/// and remembers what it was asked.
pub struct MockGenerationClient {
    outcome: MockOutcome,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

enum MockOutcome {
    Respond(GenerationResponse),
    Fail(String),
}

impl MockGenerationClient {
    pub fn new(text: &str) -> Self {
        Self::with_outcome(MockOutcome::Respond(GenerationResponse::with_text(text)))
    }

    /// A model that answers with no text content at all.
    pub fn silent() -> Self {
        Self::with_outcome(MockOutcome::Respond(GenerationResponse::default()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_outcome(MockOutcome::Fail(message.to_string()))
    }

    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }
        match &self.outcome {
            MockOutcome::Respond(response) => Ok(response.clone()),
            MockOutcome::Fail(message) => Err(ExtractError::Transport(message.clone())),
        }
    }
}
