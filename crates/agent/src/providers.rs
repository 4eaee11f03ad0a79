//! HTTP model providers.
//!
//! Two wire formats cover the supported providers: Gemini's `generateContent`
//! and the OpenAI-compatible `/chat/completions` (used for OpenAI and Ollama).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderbot_core::config::{LlmConfig, LlmProvider};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::llm::{LlmClient, LlmError, ResilientLlmClient};

const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Builds the configured provider wrapped with timeout and retry handling.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let base_url = config.effective_base_url().trim_end_matches('/').to_string();

    let provider: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::Unavailable("gemini api key is not set".to_string()))?;
            Arc::new(GeminiClient::new(base_url, config.model.clone(), api_key, timeout)?)
        }
        LlmProvider::OpenAi | LlmProvider::Ollama => Arc::new(ChatCompletionsClient::new(
            base_url,
            config.model.clone(),
            config.api_key.clone(),
            timeout,
        )?),
    };

    Ok(Arc::new(ResilientLlmClient::new(
        provider,
        timeout,
        config.max_retries,
        Duration::from_millis(config.retry_backoff_ms),
    )))
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| LlmError::Http(e.to_string()))
}

fn transport_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Http(format!("request timed out: {error}"))
    } else {
        LlmError::Http(error.to_string())
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, LlmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status { status: status.as_u16(), body });
    }
    response.text().await.map_err(transport_error)
}

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self { client: http_client(timeout)?, base_url, model, api_key })
    }

    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn gemini_text(payload: &str) -> Result<String, LlmError> {
    let parsed: GeminiResponse =
        serde_json::from_str(payload).map_err(|e| LlmError::Serialization(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(LlmError::Response(format!("Gemini API error: {}", error.message)));
    }

    let text = parsed
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().map(|part| part.text).collect::<String>())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| LlmError::Response("no content in Gemini response".to_string()))?;

    Ok(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(self.api_key.expose_secret())
                .map_err(|e| LlmError::Http(e.to_string()))?,
        );

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            generation_config: GeminiGenerationConfig { temperature: DEFAULT_TEMPERATURE },
        };

        let response = self
            .client
            .post(self.build_url())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        gemini_text(&read_success_body(response).await?)
    }
}

pub struct ChatCompletionsClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self { client: http_client(timeout)?, base_url, model, api_key })
    }

    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

fn chat_text(payload: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse =
        serde_json::from_str(payload).map_err(|e| LlmError::Serialization(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| LlmError::Response("missing choices in chat completion".to_string()))
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = format!("Bearer {}", key.expose_secret());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|e| LlmError::Http(e.to_string()))?,
            );
        }

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
            temperature: DEFAULT_TEMPERATURE,
        };

        let response = self
            .client
            .post(self.build_url())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        chat_text(&read_success_body(response).await?)
    }
}
