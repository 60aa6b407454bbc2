use arbor_core::config::LoadOptions;

use super::{load_catalog, CommandResult};

pub fn run(options: &LoadOptions) -> CommandResult {
    match load_catalog("tree", options) {
        Ok((_, catalog)) => CommandResult::text(catalog.dump_tree().trim_end()),
        Err(failure) => failure,
    }
}
