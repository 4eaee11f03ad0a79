use thiserror::Error;

use crate::backend::BackendError;

pub const PLANNING_APOLOGY: &str =
    "I'm sorry, I had trouble understanding that. Could you please rephrase?";
pub const RESPONSE_APOLOGY: &str =
    "I'm sorry, I couldn't put together a reply just now. Please try again in a moment.";

/// Per-turn failures. None of these abort a session; each maps to a reply.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("planning failed: {0}")]
    Planning(String),
    #[error("tool `{0}` is not available")]
    UnavailableTool(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("response generation failed: {0}")]
    Response(String),
}

impl AgentError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Planning(_) => "planning_failure",
            Self::UnavailableTool(_) => "unavailable_tool",
            Self::Backend(_) => "backend_failure",
            Self::Response(_) => "response_failure",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Planning(_) => PLANNING_APOLOGY.to_string(),
            Self::UnavailableTool(name) => {
                format!("I'm sorry, I tried to use a tool called '{name}' but it's not available.")
            }
            Self::Backend(error) => match error.reason() {
                Some(reason) => format!("{error} {reason}"),
                None => error.to_string(),
            },
            Self::Response(_) => RESPONSE_APOLOGY.to_string(),
        }
    }
}
