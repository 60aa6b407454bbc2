pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use arbor_core::config::{AppConfig, LoadOptions, LoggingConfig};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "arbor",
    about = "Arbor catalog operator CLI",
    long_about = "Inspect the category tree, query typeahead suggestions, review reports and run the interactive catalog shell.",
    after_help = "Examples:\n  arbor tree\n  arbor suggest cel --repeat 2\n  arbor report --json\n  arbor shell"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an arbor.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Print the balanced tree with products, subcategories, heights and balance factors")]
    Tree,
    #[command(about = "Rank products whose name starts with a prefix")]
    Suggest {
        prefix: String,
        #[arg(long, help = "Maximum number of suggestions (defaults to suggestions.default_limit)")]
        limit: Option<usize>,
        #[arg(long, default_value_t = 1, help = "Run the same query several times in a row")]
        repeat: usize,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List top-level categories sorted by name")]
    Categories {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List every product, heaviest first")]
    Products {
        #[arg(long, help = "Show at most this many products")]
        limit: Option<usize>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Report tree size, height, balance and operation costs")]
    Report {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, tree invariants and suggestion index consistency")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Start the interactive numbered menu over an in-memory catalog")]
    Shell,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };
    init_logging(&options);

    let result = match cli.command {
        Command::Tree => commands::tree::run(&options),
        Command::Suggest { prefix, limit, repeat, json } => {
            commands::suggest::run(&options, &prefix, limit, repeat, json)
        }
        Command::Categories { json } => commands::categories::run(&options, json),
        Command::Products { limit, json } => commands::products::run(&options, limit, json),
        Command::Report { json } => commands::report::run(&options, json),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
        Command::Shell => commands::shell::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays parseable for `--json` commands.
fn init_logging(options: &LoadOptions) {
    use arbor_core::config::LogFormat::*;
    use tracing::Level;

    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig { level: "warn".to_string(), ..AppConfig::default().logging });
    let log_level = logging.level.parse::<Level>().unwrap_or(Level::WARN);

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);
    let _ = match logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}
