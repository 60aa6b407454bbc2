use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::path::CategoryPath;

/// One typeahead candidate: a product and where it lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub product_name: String,
    pub category_path: CategoryPath,
}

/// A product in the flat listing, carrying its own weight.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductListing {
    pub name: String,
    pub category_path: CategoryPath,
    pub popularity_weight: f64,
}

/// Tree shape summary with an independently measured height and balance check.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub category_count: usize,
    pub height: usize,
    pub balanced: bool,
    /// Operation name to asymptotic cost.
    pub complexity_notes: BTreeMap<&'static str, &'static str>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// Never built.
    Empty,
    /// Built from the tree's current revision.
    Built,
    /// Built from an older revision; rankings may be outdated.
    Stale,
}

impl IndexState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Built => "built",
            Self::Stale => "stale",
        }
    }
}

/// Weight before and after an adjustment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeightChange {
    pub name: String,
    pub before: f64,
    pub after: f64,
}

/// Effect of confirming a product selection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectionOutcome {
    pub category_path: CategoryPath,
    pub category: WeightChange,
    pub subcategory: Option<WeightChange>,
    pub product: WeightChange,
}
