pub mod categories;
pub mod config;
pub mod doctor;
pub mod products;
pub mod report;
pub mod shell;
pub mod suggest;
pub mod tree;

use arbor_core::config::{AppConfig, LoadOptions};
use arbor_core::fixtures::demo_categories;
use arbor_core::{Catalog, CatalogSettings};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Plain human-readable output with a zero exit code.
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    /// Pretty JSON for `--json` output.
    pub fn json<T: Serialize>(command: &str, value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(output) => Self::text(output),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Loads configuration and builds the in-memory catalog every command works
/// on, seeded with the demo data unless `catalog.seed_demo_data` is off.
pub fn load_catalog(
    command: &str,
    options: &LoadOptions,
) -> Result<(AppConfig, Catalog), CommandResult> {
    let config = AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;
    let catalog = build_catalog(&config);
    Ok((config, catalog))
}

pub fn build_catalog(config: &AppConfig) -> Catalog {
    let settings = CatalogSettings::from(config);
    if config.catalog.seed_demo_data {
        Catalog::with_categories(settings, demo_categories())
    } else {
        Catalog::new(settings)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
