use arbor_core::config::LoadOptions;

use super::{load_catalog, CommandResult};

pub fn run(options: &LoadOptions, limit: Option<usize>, json_output: bool) -> CommandResult {
    let (_, catalog) = match load_catalog("products", options) {
        Ok(loaded) => loaded,
        Err(failure) => return failure,
    };
    let mut listings = catalog.list_all_products();
    if let Some(limit) = limit {
        listings.truncate(limit);
    }

    if json_output {
        return CommandResult::json("products", &listings);
    }
    if listings.is_empty() {
        return CommandResult::text("no products");
    }

    let lines = listings
        .iter()
        .map(|listing| {
            format!(
                "- {} | {} | weight={:.3}",
                listing.name, listing.category_path, listing.popularity_weight
            )
        })
        .collect::<Vec<_>>();
    CommandResult::text(lines.join("\n"))
}
