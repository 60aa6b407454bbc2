use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::category::{DEFAULT_POPULARITY, MAX_BOUNDED_WEIGHT};
use crate::suggestions::{DEFAULT_MAX_PREFIX_LEN, DEFAULT_SUGGESTION_LIMIT};

pub const DEFAULT_CONFIG_FILE: &str = "arbor.toml";
pub const NESTED_CONFIG_FILE: &str = "config/arbor.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub suggestions: SuggestionsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub default_popularity: f64,
    pub seed_demo_data: bool,
}

#[derive(Clone, Debug)]
pub struct SuggestionsConfig {
    pub max_prefix_len: usize,
    pub default_limit: usize,
    pub auto_rebuild_stale: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub default_page_size: usize,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub seed_demo_data: Option<bool>,
    pub default_limit: Option<usize>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig { default_popularity: DEFAULT_POPULARITY, seed_demo_data: true },
            suggestions: SuggestionsConfig {
                max_prefix_len: DEFAULT_MAX_PREFIX_LEN,
                default_limit: DEFAULT_SUGGESTION_LIMIT,
                auto_rebuild_stale: true,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                default_page_size: 50,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(default_popularity) = catalog.default_popularity {
                self.catalog.default_popularity = default_popularity;
            }
            if let Some(seed_demo_data) = catalog.seed_demo_data {
                self.catalog.seed_demo_data = seed_demo_data;
            }
        }

        if let Some(suggestions) = patch.suggestions {
            if let Some(max_prefix_len) = suggestions.max_prefix_len {
                self.suggestions.max_prefix_len = max_prefix_len;
            }
            if let Some(default_limit) = suggestions.default_limit {
                self.suggestions.default_limit = default_limit;
            }
            if let Some(auto_rebuild_stale) = suggestions.auto_rebuild_stale {
                self.suggestions.auto_rebuild_stale = auto_rebuild_stale;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(default_page_size) = server.default_page_size {
                self.server.default_page_size = default_page_size;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ARBOR_CATALOG_DEFAULT_POPULARITY") {
            self.catalog.default_popularity =
                parse_f64("ARBOR_CATALOG_DEFAULT_POPULARITY", &value)?;
        }
        if let Some(value) = read_env("ARBOR_CATALOG_SEED_DEMO_DATA") {
            self.catalog.seed_demo_data = parse_bool("ARBOR_CATALOG_SEED_DEMO_DATA", &value)?;
        }

        if let Some(value) = read_env("ARBOR_SUGGESTIONS_MAX_PREFIX_LEN") {
            self.suggestions.max_prefix_len =
                parse_usize("ARBOR_SUGGESTIONS_MAX_PREFIX_LEN", &value)?;
        }
        if let Some(value) = read_env("ARBOR_SUGGESTIONS_DEFAULT_LIMIT") {
            self.suggestions.default_limit =
                parse_usize("ARBOR_SUGGESTIONS_DEFAULT_LIMIT", &value)?;
        }
        if let Some(value) = read_env("ARBOR_SUGGESTIONS_AUTO_REBUILD_STALE") {
            self.suggestions.auto_rebuild_stale =
                parse_bool("ARBOR_SUGGESTIONS_AUTO_REBUILD_STALE", &value)?;
        }

        if let Some(value) = read_env("ARBOR_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ARBOR_SERVER_PORT") {
            self.server.port = parse_u16("ARBOR_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ARBOR_SERVER_DEFAULT_PAGE_SIZE") {
            self.server.default_page_size = parse_usize("ARBOR_SERVER_DEFAULT_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("ARBOR_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ARBOR_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("ARBOR_LOGGING_LEVEL").or_else(|| read_env("ARBOR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("ARBOR_LOGGING_FORMAT").or_else(|| read_env("ARBOR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(seed_demo_data) = overrides.seed_demo_data {
            self.catalog.seed_demo_data = seed_demo_data;
        }
        if let Some(default_limit) = overrides.default_limit {
            self.suggestions.default_limit = default_limit;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_suggestions(&self.suggestions)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `load` would read: the explicit path if it exists,
/// otherwise the first default location present.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    let popularity = catalog.default_popularity;
    if !popularity.is_finite() || !(0.0..=MAX_BOUNDED_WEIGHT).contains(&popularity) {
        return Err(ConfigError::Validation(format!(
            "catalog.default_popularity must be a finite number in range 0.0..={MAX_BOUNDED_WEIGHT:.1}"
        )));
    }

    Ok(())
}

fn validate_suggestions(suggestions: &SuggestionsConfig) -> Result<(), ConfigError> {
    if suggestions.max_prefix_len == 0 || suggestions.max_prefix_len > 64 {
        return Err(ConfigError::Validation(
            "suggestions.max_prefix_len must be in range 1..=64".to_string(),
        ));
    }

    if suggestions.default_limit == 0 {
        return Err(ConfigError::Validation(
            "suggestions.default_limit must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.default_page_size == 0 || server.default_page_size > 500 {
        return Err(ConfigError::Validation(
            "server.default_page_size must be in range 1..=500".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    suggestions: Option<SuggestionsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    default_popularity: Option<f64>,
    seed_demo_data: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionsPatch {
    max_prefix_len: Option<usize>,
    default_limit: Option<usize>,
    auto_rebuild_stale: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    default_page_size: Option<usize>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.catalog.default_popularity == 1.0, "default popularity should be 1.0")?;
        ensure(config.catalog.seed_demo_data, "demo data should be seeded by default")?;
        ensure(config.suggestions.max_prefix_len == 10, "prefix cap should default to 10")?;
        ensure(config.suggestions.default_limit == 7, "suggestion limit should default to 7")?;
        ensure(config.suggestions.auto_rebuild_stale, "stale rebuild should default on")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ARBOR_BIND", "0.0.0.0");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("arbor.toml");
            fs::write(
                &path,
                r#"
[server]
bind_address = "${TEST_ARBOR_BIND}"
port = 9090
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.bind_address == "0.0.0.0", "bind address should be interpolated")?;
            ensure(config.server.port == 9090, "port should be read from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_ARBOR_BIND"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("arbor.toml");
        fs::write(&path, "[logging]\nlevel = \"${ARBOR_TEST_UNSET_LEVEL}\"\n")
            .map_err(|err| err.to_string())?;

        let outcome = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(
                outcome,
                Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "ARBOR_TEST_UNSET_LEVEL"
            ),
            "missing interpolation variable should be named",
        )
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let outcome = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(outcome, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should fail",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ARBOR_LOG_LEVEL", "warn");
        env::set_var("ARBOR_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["ARBOR_LOG_LEVEL", "ARBOR_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ARBOR_SUGGESTIONS_MAX_PREFIX_LEN", "12");
        env::set_var("ARBOR_SERVER_PORT", "7070");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("arbor.toml");
            fs::write(
                &path,
                r#"
[catalog]
default_popularity = 2.5
seed_demo_data = false

[suggestions]
max_prefix_len = 6
default_limit = 3

[server]
port = 9090

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    port: Some(6060),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.catalog.default_popularity == 2.5, "file popularity should apply")?;
            ensure(!config.catalog.seed_demo_data, "file should disable demo data")?;
            ensure(config.suggestions.default_limit == 3, "file limit should apply")?;
            ensure(config.suggestions.max_prefix_len == 12, "env prefix cap should win over file")?;
            ensure(config.server.port == 6060, "override port should win over env and file")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["ARBOR_SUGGESTIONS_MAX_PREFIX_LEN", "ARBOR_SERVER_PORT"]);
        result
    }

    #[test]
    fn unparsable_env_value_names_the_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ARBOR_SUGGESTIONS_DEFAULT_LIMIT", "many");

        let outcome = AppConfig::load(LoadOptions::default());
        let result = ensure(
            matches!(
                outcome,
                Err(ConfigError::InvalidEnvOverride { ref key, ref value })
                    if key == "ARBOR_SUGGESTIONS_DEFAULT_LIMIT" && value == "many"
            ),
            "invalid env override should name key and value",
        );

        clear_vars(&["ARBOR_SUGGESTIONS_DEFAULT_LIMIT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ARBOR_CATALOG_DEFAULT_POPULARITY", "12.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("catalog.default_popularity")
            );
            ensure(has_message, "validation failure should mention catalog.default_popularity")
        })();

        clear_vars(&["ARBOR_CATALOG_DEFAULT_POPULARITY"]);
        result
    }

    #[test]
    fn prefix_cap_and_page_size_are_bounded() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let mut config = AppConfig::default();
        config.suggestions.max_prefix_len = 0;
        ensure(
            matches!(config.validate(), Err(ConfigError::Validation(ref m)) if m.contains("max_prefix_len")),
            "zero prefix cap should be rejected",
        )?;

        let mut config = AppConfig::default();
        config.server.default_page_size = 501;
        ensure(
            matches!(config.validate(), Err(ConfigError::Validation(ref m)) if m.contains("default_page_size")),
            "oversized page should be rejected",
        )
    }
}
