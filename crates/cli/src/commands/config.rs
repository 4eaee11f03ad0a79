use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use orderbot_core::config::{resolve_config_path, AppConfig, LlmProvider, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field<'a> {
    key: &'static str,
    value: String,
    env_keys: &'a [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let llm = &config.llm;
    let api_key = match &llm.api_key {
        Some(key) => redact_token(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    // GEMINI_API_KEY only feeds the key when the provider is gemini.
    let api_key_env: &[&'static str] = if llm.provider == LlmProvider::Gemini {
        &["ORDERBOT_LLM_API_KEY", "GEMINI_API_KEY"]
    } else {
        &["ORDERBOT_LLM_API_KEY"]
    };

    let fields = [
        Field {
            key: "llm.provider",
            value: format!("{:?}", llm.provider).to_ascii_lowercase(),
            env_keys: &["ORDERBOT_LLM_PROVIDER"],
        },
        Field { key: "llm.model", value: llm.model.clone(), env_keys: &["ORDERBOT_LLM_MODEL"] },
        Field {
            key: "llm.base_url",
            value: llm.effective_base_url().to_string(),
            env_keys: &["ORDERBOT_LLM_BASE_URL"],
        },
        Field {
            key: "llm.api_key",
            value: api_key,
            env_keys: api_key_env,
        },
        Field {
            key: "llm.timeout_secs",
            value: llm.timeout_secs.to_string(),
            env_keys: &["ORDERBOT_LLM_TIMEOUT_SECS"],
        },
        Field {
            key: "llm.max_retries",
            value: llm.max_retries.to_string(),
            env_keys: &["ORDERBOT_LLM_MAX_RETRIES"],
        },
        Field {
            key: "llm.retry_backoff_ms",
            value: llm.retry_backoff_ms.to_string(),
            env_keys: &["ORDERBOT_LLM_RETRY_BACKOFF_MS"],
        },
        Field {
            key: "session.max_history_turns",
            value: config.session.max_history_turns.to_string(),
            env_keys: &["ORDERBOT_SESSION_MAX_HISTORY_TURNS"],
        },
        Field {
            key: "session.strict_parameters",
            value: config.session.strict_parameters.to_string(),
            env_keys: &["ORDERBOT_SESSION_STRICT_PARAMETERS"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["ORDERBOT_LOGGING_LEVEL", "ORDERBOT_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            env_keys: &["ORDERBOT_LOGGING_FORMAT", "ORDERBOT_LOG_FORMAT"],
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognizable prefix (`sk-`) and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
