//! Prefix suggestion index
//!
//! A derived, rebuildable view of the catalog tree: upper-cased product name
//! prefixes mapped to `(product, category path)` candidates, ranked at query
//! time by the popularity of the category each candidate lives in.

mod index;
mod report;
mod scoring;
mod types;

pub use index::{SuggestionIndex, DEFAULT_MAX_PREFIX_LEN};
pub use report::{flat_product_list, performance_report};
pub use scoring::{
    apply_query_credit, apply_selection, locate_product, rank, resolved_popularity, QueryCredit,
    SelectionCredit, DEFAULT_QUERY_CREDIT, DEFAULT_SELECTION_CREDIT,
};
pub use types::*;

/// Suggestions returned when the caller does not ask for a specific count.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 7;
