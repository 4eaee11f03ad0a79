use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

impl LlmError {
    /// Transport-level failures worth retrying. Malformed payloads never are.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Response(_) | Self::Serialization(_) | Self::Unavailable(_) => false,
        }
    }
}

/// Bounds every call with a timeout and retries transient failures with linear backoff.
pub struct ResilientLlmClient {
    inner: Arc<dyn LlmClient>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl ResilientLlmClient {
    pub fn new(
        inner: Arc<dyn LlmClient>,
        timeout: Duration,
        max_retries: u32,
        backoff: Duration,
    ) -> Self {
        Self { inner, timeout, max_retries, backoff }
    }
}

#[async_trait]
impl LlmClient for ResilientLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut attempt = 0u32;
        loop {
            let result = match tokio::time::timeout(self.timeout, self.inner.complete(prompt)).await
            {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout(self.timeout)),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(error) if error.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "agent.llm.retry",
                        attempt,
                        max_retries = self.max_retries,
                        error = %error,
                        "transient model failure, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Replays queued replies in order and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies = replies.into_iter().map(|reply| Ok(reply.into())).collect();
        Self { replies: Mutex::new(replies), prompts: Mutex::new(Vec::new()) }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(reply.into()));
        }
    }

    pub fn push_error(&self, error: LlmError) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(error));
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|prompts| prompts.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|prompts| prompts.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self
            .replies
            .lock()
            .map_err(|_| LlmError::Unavailable("scripted reply queue is poisoned".to_string()))?
            .pop_front();

        next.unwrap_or_else(|| Err(LlmError::Unavailable("no scripted reply left".to_string())))
    }
}
