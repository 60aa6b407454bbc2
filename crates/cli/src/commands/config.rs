use std::env;
use std::fs;
use std::path::Path;

use arbor_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use super::CommandResult;

/// Config keys in display order with the env keys that override them.
const FIELDS: &[(&str, &[&str])] = &[
    ("catalog.default_popularity", &["ARBOR_CATALOG_DEFAULT_POPULARITY"]),
    ("catalog.seed_demo_data", &["ARBOR_CATALOG_SEED_DEMO_DATA"]),
    ("suggestions.max_prefix_len", &["ARBOR_SUGGESTIONS_MAX_PREFIX_LEN"]),
    ("suggestions.default_limit", &["ARBOR_SUGGESTIONS_DEFAULT_LIMIT"]),
    ("suggestions.auto_rebuild_stale", &["ARBOR_SUGGESTIONS_AUTO_REBUILD_STALE"]),
    ("server.bind_address", &["ARBOR_SERVER_BIND_ADDRESS"]),
    ("server.port", &["ARBOR_SERVER_PORT"]),
    ("server.default_page_size", &["ARBOR_SERVER_DEFAULT_PAGE_SIZE"]),
    ("server.graceful_shutdown_secs", &["ARBOR_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ("logging.level", &["ARBOR_LOGGING_LEVEL", "ARBOR_LOG_LEVEL"]),
    ("logging.format", &["ARBOR_LOGGING_FORMAT", "ARBOR_LOG_FORMAT"]),
];

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            )
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_keys) in FIELDS {
        let value = effective_value(&config, key_path);
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {key_path} = {value} (source: {source})"));
    }

    CommandResult::text(lines.join("\n"))
}

fn effective_value(config: &AppConfig, key_path: &str) -> String {
    match key_path {
        "catalog.default_popularity" => config.catalog.default_popularity.to_string(),
        "catalog.seed_demo_data" => config.catalog.seed_demo_data.to_string(),
        "suggestions.max_prefix_len" => config.suggestions.max_prefix_len.to_string(),
        "suggestions.default_limit" => config.suggestions.default_limit.to_string(),
        "suggestions.auto_rebuild_stale" => config.suggestions.auto_rebuild_stale.to_string(),
        "server.bind_address" => config.server.bind_address.clone(),
        "server.port" => config.server.port.to_string(),
        "server.default_page_size" => config.server.default_page_size.to_string(),
        "server.graceful_shutdown_secs" => config.server.graceful_shutdown_secs.to_string(),
        "logging.level" => config.logging.level.clone(),
        "logging.format" => format!("{:?}", config.logging.format).to_ascii_lowercase(),
        _ => "<unknown>".to_string(),
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_hit = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_hit {
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
