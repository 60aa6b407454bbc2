use std::collections::HashMap;

use super::types::{IndexState, Suggestion};
use crate::catalog::CatalogTree;
use crate::domain::category::Category;
use crate::domain::path::CategoryPath;

/// Longest prefix registered for a product name unless configured otherwise.
pub const DEFAULT_MAX_PREFIX_LEN: usize = 10;

/// Prefix lookup derived from a [`CatalogTree`].
///
/// Never patched incrementally: [`SuggestionIndex::rebuild`] throws the old
/// contents away and walks the whole tree again. Keys are upper-cased name
/// prefixes of 1 up to `max_prefix_len` characters.
#[derive(Clone, Debug, PartialEq)]
pub struct SuggestionIndex {
    max_prefix_len: usize,
    prefixes: HashMap<String, Vec<Suggestion>>,
    paths: HashMap<String, CategoryPath>,
    built_revision: Option<u64>,
}

impl Default for SuggestionIndex {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PREFIX_LEN)
    }
}

impl SuggestionIndex {
    pub fn new(max_prefix_len: usize) -> Self {
        Self {
            max_prefix_len,
            prefixes: HashMap::new(),
            paths: HashMap::new(),
            built_revision: None,
        }
    }

    pub fn max_prefix_len(&self) -> usize {
        self.max_prefix_len
    }

    pub fn rebuild(&mut self, tree: &CatalogTree) {
        self.prefixes.clear();
        self.paths.clear();
        for category in tree.list_all() {
            self.index_category(category, CategoryPath::root(category.name()));
        }
        self.built_revision = Some(tree.revision());
    }

    fn index_category(&mut self, category: &Category, path: CategoryPath) {
        for product in category.products() {
            self.register(&product.name, &path);
        }
        for subcategory in category.subcategories() {
            self.index_category(subcategory, path.child(subcategory.name()));
        }
    }

    fn register(&mut self, product_name: &str, path: &CategoryPath) {
        if product_name.is_empty() {
            return;
        }

        let upper = product_name.to_uppercase();
        let mut prefix = String::with_capacity(upper.len());
        for character in upper.chars().take(self.max_prefix_len) {
            prefix.push(character);
            let bucket = self.prefixes.entry(prefix.clone()).or_default();
            let known = bucket.iter().any(|candidate| {
                candidate.product_name == product_name && candidate.category_path == *path
            });
            if !known {
                bucket.push(Suggestion {
                    product_name: product_name.to_owned(),
                    category_path: path.clone(),
                });
            }
        }

        // A product name seen under several paths keeps the last one visited.
        self.paths.insert(product_name.to_lowercase(), path.clone());
    }

    /// Candidates registered under exactly this prefix, in registration order.
    /// Matching ignores case; there is no fallback to shorter prefixes.
    pub fn candidates(&self, prefix: &str) -> &[Suggestion] {
        if prefix.is_empty() {
            return &[];
        }
        self.prefixes.get(&prefix.to_uppercase()).map(Vec::as_slice).unwrap_or_default()
    }

    /// Most recently indexed path of a product, looked up ignoring case.
    pub fn category_path_of(&self, product_name: &str) -> Option<&CategoryPath> {
        self.paths.get(&product_name.to_lowercase())
    }

    /// Every registered prefix, sorted.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.prefixes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Distinct product names (ignoring case) seen by the last rebuild.
    pub fn indexed_product_count(&self) -> usize {
        self.paths.len()
    }

    pub fn built_revision(&self) -> Option<u64> {
        self.built_revision
    }

    pub fn state(&self, tree_revision: u64) -> IndexState {
        match self.built_revision {
            None => IndexState::Empty,
            Some(revision) if revision == tree_revision => IndexState::Built,
            Some(_) => IndexState::Stale,
        }
    }
}
