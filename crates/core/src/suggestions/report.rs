use std::collections::BTreeMap;

use super::types::{PerformanceReport, ProductListing};
use crate::catalog::CatalogTree;
use crate::domain::category::Category;
use crate::domain::path::CategoryPath;

pub fn performance_report(tree: &CatalogTree) -> PerformanceReport {
    PerformanceReport {
        category_count: tree.len(),
        height: tree.measured_height(),
        balanced: tree.is_balanced(),
        complexity_notes: complexity_notes(),
    }
}

fn complexity_notes() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("category_count", "O(1)"),
        ("tree_height", "O(n)"),
        ("balance_check", "O(n)"),
        ("find_category", "O(log n)"),
        ("insert_category", "O(log n)"),
        ("remove_category", "O(log n)"),
        ("suggest", "O(1) + O(k)"),
        ("rebuild_index", "O(n + p * L)"),
    ])
}

/// Every product in the tree, nested subcategories included, heaviest first.
/// Equal weights keep traversal order.
pub fn flat_product_list(tree: &CatalogTree) -> Vec<ProductListing> {
    let mut listings = Vec::new();
    for category in tree.list_all() {
        collect(category, CategoryPath::root(category.name()), &mut listings);
    }
    listings.sort_by(|a, b| b.popularity_weight.total_cmp(&a.popularity_weight));
    listings
}

fn collect(category: &Category, path: CategoryPath, listings: &mut Vec<ProductListing>) {
    for product in category.products() {
        listings.push(ProductListing {
            name: product.name.clone(),
            category_path: path.clone(),
            popularity_weight: product.weight,
        });
    }
    for subcategory in category.subcategories() {
        collect(subcategory, path.child(subcategory.name()), listings);
    }
}
