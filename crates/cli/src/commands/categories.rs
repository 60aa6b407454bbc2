use arbor_core::config::LoadOptions;
use arbor_core::Category;
use serde::Serialize;

use super::{load_catalog, CommandResult};

#[derive(Debug, Serialize)]
struct CategorySummary<'a> {
    name: &'a str,
    popularity: f64,
    product_count: usize,
    total_product_count: usize,
    subcategories: Vec<&'a str>,
}

impl<'a> From<&'a Category> for CategorySummary<'a> {
    fn from(category: &'a Category) -> Self {
        Self {
            name: category.name(),
            popularity: category.popularity(),
            product_count: category.product_count(),
            total_product_count: category.total_product_count(),
            subcategories: category.subcategories().iter().map(Category::name).collect(),
        }
    }
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let (_, catalog) = match load_catalog("categories", options) {
        Ok(loaded) => loaded,
        Err(failure) => return failure,
    };
    let summaries: Vec<CategorySummary<'_>> =
        catalog.list_all_categories().into_iter().map(CategorySummary::from).collect();

    if json_output {
        return CommandResult::json("categories", &summaries);
    }
    if summaries.is_empty() {
        return CommandResult::text("no categories");
    }

    let lines = summaries
        .iter()
        .map(|summary| {
            let nested = if summary.subcategories.is_empty() {
                String::new()
            } else {
                format!(" [{}]", summary.subcategories.join(", "))
            };
            format!(
                "- {} (popularity={:.3}, products={}/{}){nested}",
                summary.name,
                summary.popularity,
                summary.product_count,
                summary.total_product_count
            )
        })
        .collect::<Vec<_>>();
    CommandResult::text(lines.join("\n"))
}
