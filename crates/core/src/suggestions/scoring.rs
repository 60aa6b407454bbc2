//! Ranking and popularity credit rules for suggestions and selections.

use super::types::{SelectionOutcome, Suggestion, WeightChange};
use crate::catalog::CatalogTree;
use crate::domain::category::Category;
use crate::domain::path::CategoryPath;

/// Uncapped credit handed to the top-ranked result of every prefix query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryCredit {
    /// Top-level category popularity (default: 0.002)
    pub category: f64,
    /// Product weight, when the product sits directly in the top-level category (default: 0.001)
    pub product: f64,
    /// Subcategory popularity (default: 0.001)
    pub subcategory: f64,
    /// Product weight inside that subcategory (default: 0.001)
    pub subcategory_product: f64,
}

pub const DEFAULT_QUERY_CREDIT: QueryCredit =
    QueryCredit { category: 0.002, product: 0.001, subcategory: 0.001, subcategory_product: 0.001 };

impl Default for QueryCredit {
    fn default() -> Self {
        DEFAULT_QUERY_CREDIT
    }
}

/// Bounded credit applied when a user confirms a product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionCredit {
    pub category: f64,
    pub subcategory: f64,
    pub product: f64,
}

pub const DEFAULT_SELECTION_CREDIT: SelectionCredit =
    SelectionCredit { category: 0.008, subcategory: 0.003, product: 0.005 };

impl Default for SelectionCredit {
    fn default() -> Self {
        DEFAULT_SELECTION_CREDIT
    }
}

/// Popularity used to rank a candidate: the deepest category on its path,
/// falling back to the top-level category when the nested part no longer
/// resolves, and 0.0 when the top-level category is gone.
pub fn resolved_popularity(tree: &CatalogTree, path: &CategoryPath) -> f64 {
    let Some(top) = path.top_level().and_then(|name| tree.search(name)) else {
        return 0.0;
    };
    top.descendant(path.nested()).unwrap_or(top).popularity()
}

/// Orders candidates by [`resolved_popularity`], highest first, keeping the
/// original order among ties, and keeps at most `limit` of them.
pub fn rank(tree: &CatalogTree, candidates: &[Suggestion], limit: usize) -> Vec<Suggestion> {
    let mut scored: Vec<(f64, &Suggestion)> = candidates
        .iter()
        .map(|candidate| (resolved_popularity(tree, &candidate.category_path), candidate))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, candidate)| candidate.clone()).collect()
}

/// Credits the top-ranked suggestion of a query. Returns false when its
/// top-level category no longer exists.
///
/// The product credit at top level is a no-op for products that live in a
/// subcategory. The subcategory credit applies only when the leaf of the path
/// names a category other than the top-level one.
pub fn apply_query_credit(
    tree: &mut CatalogTree,
    suggestion: &Suggestion,
    credit: &QueryCredit,
) -> bool {
    let path = &suggestion.category_path;
    let Some(top) = path.top_level().and_then(|name| tree.search_mut(name)) else {
        return false;
    };

    top.score_popularity(credit.category);
    top.score_product_weight(&suggestion.product_name, credit.product);

    if let Some((leaf, parents)) = path.nested().split_last() {
        if leaf != top.name() {
            credit_subcategory(top, parents, leaf, &suggestion.product_name, credit);
        }
    }
    true
}

fn credit_subcategory(
    top: &mut Category,
    parents: &[String],
    leaf: &str,
    product_name: &str,
    credit: &QueryCredit,
) {
    let Some(parent) = top.descendant_mut(parents) else {
        return;
    };
    if parent.score_subcategory_popularity(leaf, credit.subcategory) {
        if let Some(subcategory) = parent.subcategory_mut(leaf) {
            subcategory.score_product_weight(product_name, credit.subcategory_product);
        }
    }
}

/// Where `product_name` lives under the top-level category `category`: a
/// direct subcategory holding it wins over the category itself. Matching is
/// exact on both names.
pub fn locate_product(tree: &CatalogTree, category: &str, product_name: &str) -> Option<CategoryPath> {
    let top = tree.search(category)?;
    let root = CategoryPath::root(top.name());
    top.subcategories()
        .iter()
        .find(|subcategory| subcategory.product(product_name).is_some())
        .map(|subcategory| root.child(subcategory.name()))
        .or_else(|| top.product(product_name).map(|_| root.clone()))
}

/// Applies the bounded selection credit to the category, the direct
/// subcategory holding the product (if any) and the product itself.
pub fn apply_selection(
    tree: &mut CatalogTree,
    category: &str,
    product_name: &str,
    credit: &SelectionCredit,
) -> Option<SelectionOutcome> {
    let category_path = locate_product(tree, category, product_name)?;
    let top = tree.search_mut(category)?;

    let category_change = adjust(top, |c| c.increase_popularity(credit.category));

    let (subcategory_change, holder) = match category_path.nested().first() {
        Some(name) => {
            let subcategory = top.subcategory_mut(name)?;
            let change = adjust(subcategory, |c| c.increase_popularity(credit.subcategory));
            (Some(change), subcategory)
        }
        None => (None, top),
    };

    let before = holder.product(product_name)?.weight;
    holder.increase_product_weight(product_name, credit.product);
    let after = holder.product(product_name).map_or(before, |product| product.weight);

    Some(SelectionOutcome {
        category_path,
        category: category_change,
        subcategory: subcategory_change,
        product: WeightChange { name: product_name.to_owned(), before, after },
    })
}

fn adjust(category: &mut Category, change: impl FnOnce(&mut Category)) -> WeightChange {
    let before = category.popularity();
    change(category);
    WeightChange { name: category.name().to_owned(), before, after: category.popularity() }
}
