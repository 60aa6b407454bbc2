use arbor_core::config::LoadOptions;
use arbor_core::Suggestion;
use serde::Serialize;

use super::{load_catalog, CommandResult};

#[derive(Debug, Serialize)]
struct SuggestReport {
    prefix: String,
    limit: usize,
    rounds: Vec<SuggestRound>,
}

#[derive(Debug, Serialize)]
struct SuggestRound {
    round: usize,
    results: Vec<Suggestion>,
}

/// Runs the same query `repeat` times against one catalog so the effect of
/// query credit on the ranking is visible between rounds.
pub fn run(
    options: &LoadOptions,
    prefix: &str,
    limit: Option<usize>,
    repeat: usize,
    json_output: bool,
) -> CommandResult {
    let (config, mut catalog) = match load_catalog("suggest", options) {
        Ok(loaded) => loaded,
        Err(failure) => return failure,
    };
    let limit = limit.unwrap_or(config.suggestions.default_limit);
    if limit == 0 {
        return CommandResult::failure("suggest", "invalid_input", "limit must be positive", 2);
    }

    let rounds = (1..=repeat.max(1))
        .map(|round| SuggestRound { round, results: catalog.suggest(prefix, limit) })
        .collect::<Vec<_>>();
    let report = SuggestReport { prefix: prefix.to_string(), limit, rounds };

    if json_output {
        CommandResult::json("suggest", &report)
    } else {
        CommandResult::text(render_human(&report))
    }
}

fn render_human(report: &SuggestReport) -> String {
    let total = report.rounds.len();
    let mut lines = Vec::new();
    for round in &report.rounds {
        lines.push(format!("suggestions for `{}` (round {} of {total}):", report.prefix, round.round));
        if round.results.is_empty() {
            lines.push("  (no suggestions)".to_string());
        }
        for (position, suggestion) in round.results.iter().enumerate() {
            lines.push(format!(
                "  {}. {} ({})",
                position + 1,
                suggestion.product_name,
                suggestion.category_path
            ));
        }
    }
    lines.join("\n")
}
