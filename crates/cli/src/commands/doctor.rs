use arbor_core::config::{AppConfig, LoadOptions};
use arbor_core::{Catalog, IndexState};
use serde::Serialize;

use super::{build_catalog, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const CATALOG_CHECKS: [&str; 4] =
    ["tree_invariants", "balance_report", "index_consistency", "suggestion_probe"];

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let catalog = build_catalog(&config);
            checks.push(check_tree_invariants(&catalog));
            checks.push(check_balance_report(&catalog));
            checks.push(check_index_consistency(&catalog));
            checks.push(check_suggestion_probe(&catalog));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(CATALOG_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all catalog checks passed".to_string()
    } else {
        "doctor: one or more catalog checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_tree_invariants(catalog: &Catalog) -> DoctorCheck {
    match catalog.validate() {
        Ok(()) => DoctorCheck {
            name: "tree_invariants",
            status: CheckStatus::Pass,
            details: format!("{} categories ordered with valid heights", catalog.category_count()),
        },
        Err(error) => DoctorCheck {
            name: "tree_invariants",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_balance_report(catalog: &Catalog) -> DoctorCheck {
    let report = catalog.performance_report();
    let consistent = report.balanced && report.height == catalog.tree().height();
    DoctorCheck {
        name: "balance_report",
        status: if consistent { CheckStatus::Pass } else { CheckStatus::Fail },
        details: format!(
            "height {} (cached {}), balanced: {}",
            report.height,
            catalog.tree().height(),
            report.balanced
        ),
    }
}

fn check_index_consistency(catalog: &Catalog) -> DoctorCheck {
    let mut rebuilt = catalog.clone();
    rebuilt.rebuild_index();

    let state = catalog.index_state();
    let idempotent = rebuilt.index() == catalog.index();
    let status = if state == IndexState::Built && idempotent {
        CheckStatus::Pass
    } else {
        CheckStatus::Fail
    };

    DoctorCheck {
        name: "index_consistency",
        status,
        details: format!(
            "index {} with {} prefixes, rebuild idempotent: {idempotent}",
            state.as_str(),
            catalog.index().prefixes().len()
        ),
    }
}

fn check_suggestion_probe(catalog: &Catalog) -> DoctorCheck {
    let Some(listing) = catalog.list_all_products().into_iter().next() else {
        return DoctorCheck {
            name: "suggestion_probe",
            status: CheckStatus::Skipped,
            details: "catalog has no products to probe".to_string(),
        };
    };

    let prefix: String = listing.name.chars().take(catalog.settings().max_prefix_len).collect();
    let mut probe = catalog.clone();
    let found = probe
        .suggest(&prefix, usize::MAX)
        .iter()
        .any(|suggestion| suggestion.product_name == listing.name);

    DoctorCheck {
        name: "suggestion_probe",
        status: if found { CheckStatus::Pass } else { CheckStatus::Fail },
        details: format!("query `{prefix}` {} `{}`", if found { "finds" } else { "misses" }, listing.name),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
