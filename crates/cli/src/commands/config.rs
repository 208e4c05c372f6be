use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use shopassist_core::config::{AppConfig, ConfigOverrides};
use toml::Value;

use super::load_config;

pub fn run(config_path: Option<&Path>) -> String {
    let config = match load_config(config_path, ConfigOverrides::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key, value) in effective_values(&config) {
        let source =
            field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<EffectiveValue> {
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        entry("llm.provider", &["SHOPASSIST_LLM_PROVIDER"], format!("{:?}", config.llm.provider)),
        entry("llm.model", &["SHOPASSIST_LLM_MODEL"], config.llm.model.clone()),
        entry(
            "llm.base_url",
            &["SHOPASSIST_LLM_BASE_URL"],
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        entry("llm.api_key", &["SHOPASSIST_LLM_API_KEY"], api_key),
        entry(
            "llm.timeout_secs",
            &["SHOPASSIST_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        entry(
            "llm.max_retries",
            &["SHOPASSIST_LLM_MAX_RETRIES"],
            config.llm.max_retries.to_string(),
        ),
        entry(
            "catalog.path",
            &["SHOPASSIST_CATALOG_PATH"],
            config.catalog.path.display().to_string(),
        ),
        entry(
            "catalog.prepared_path",
            &["SHOPASSIST_CATALOG_PREPARED_PATH"],
            config.catalog.prepared_path.display().to_string(),
        ),
        entry(
            "matching.acceptance_threshold",
            &["SHOPASSIST_MATCHING_ACCEPTANCE_THRESHOLD"],
            config.matching.acceptance_threshold.to_string(),
        ),
        entry(
            "matching.max_candidates",
            &["SHOPASSIST_MATCHING_MAX_CANDIDATES"],
            config.matching.max_candidates.to_string(),
        ),
        entry(
            "matching.budget_floor",
            &["SHOPASSIST_MATCHING_BUDGET_FLOOR"],
            config.matching.budget_floor.to_string(),
        ),
        entry(
            "logging.level",
            &["SHOPASSIST_LOGGING_LEVEL", "SHOPASSIST_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        entry(
            "logging.format",
            &["SHOPASSIST_LOGGING_FORMAT", "SHOPASSIST_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

type EffectiveValue = (&'static str, &'static [&'static str], String);

fn entry(
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
) -> EffectiveValue {
    (key_path, env_keys, value)
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("shopassist.toml"), PathBuf::from("config/shopassist.toml")]
        .into_iter()
        .find(|path| path.exists())
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
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
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

/// Keeps a provider prefix such as `sk-` so operators can tell keys apart.
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
