use arbor_core::config::LoadOptions;
use arbor_core::{Catalog, IndexState, PerformanceReport};
use serde::Serialize;

use super::{load_catalog, CommandResult};

#[derive(Debug, Serialize)]
pub(crate) struct ReportView {
    #[serde(flatten)]
    report: PerformanceReport,
    index_state: IndexState,
    indexed_products: usize,
}

impl ReportView {
    pub(crate) fn of(catalog: &Catalog) -> Self {
        Self {
            report: catalog.performance_report(),
            index_state: catalog.index_state(),
            indexed_products: catalog.index().indexed_product_count(),
        }
    }
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let (_, catalog) = match load_catalog("report", options) {
        Ok(loaded) => loaded,
        Err(failure) => return failure,
    };
    let view = ReportView::of(&catalog);

    if json_output {
        CommandResult::json("report", &view)
    } else {
        CommandResult::text(render_human(&view))
    }
}

pub(crate) fn render_human(view: &ReportView) -> String {
    let mut lines = vec![
        "=== Performance report ===".to_string(),
        format!("categories: {}", view.report.category_count),
        format!("height: {}", view.report.height),
        format!("balanced: {}", if view.report.balanced { "yes" } else { "no" }),
        format!("index: {} ({} products)", view.index_state.as_str(), view.indexed_products),
        "complexity:".to_string(),
    ];
    lines.extend(
        view.report
            .complexity_notes
            .iter()
            .map(|(operation, cost)| format!("  - {operation}: {cost}")),
    );
    lines.join("\n")
}
