//! The catalog facade used by every front end.
//!
//! [`Catalog`] owns the tree and its suggestion index and exposes the
//! operations front ends call. [`SharedCatalog`] puts one catalog behind a
//! single reader/writer lock so independent front ends can share it.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::catalog::{dump, CatalogTree};
use crate::config::AppConfig;
use crate::domain::category::{Category, DEFAULT_POPULARITY};
use crate::domain::path::CategoryPath;
use crate::errors::DomainError;
use crate::suggestions::{
    self, IndexState, PerformanceReport, ProductListing, QueryCredit, SelectionCredit,
    SelectionOutcome, Suggestion, SuggestionIndex, DEFAULT_MAX_PREFIX_LEN,
    DEFAULT_SUGGESTION_LIMIT,
};

/// Popularity credited by [`Catalog::visit_category`].
pub const VISIT_CREDIT: f64 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogSettings {
    pub default_popularity: f64,
    pub max_prefix_len: usize,
    pub default_limit: usize,
    /// Rebuild a stale index before answering a query instead of serving it.
    pub auto_rebuild_stale: bool,
    pub query_credit: QueryCredit,
    pub selection_credit: SelectionCredit,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            default_popularity: DEFAULT_POPULARITY,
            max_prefix_len: DEFAULT_MAX_PREFIX_LEN,
            default_limit: DEFAULT_SUGGESTION_LIMIT,
            auto_rebuild_stale: true,
            query_credit: QueryCredit::default(),
            selection_credit: SelectionCredit::default(),
        }
    }
}

impl From<&AppConfig> for CatalogSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_popularity: config.catalog.default_popularity,
            max_prefix_len: config.suggestions.max_prefix_len,
            default_limit: config.suggestions.default_limit,
            auto_rebuild_stale: config.suggestions.auto_rebuild_stale,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct Catalog {
    tree: CatalogTree,
    index: SuggestionIndex,
    settings: CatalogSettings,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(CatalogSettings::default())
    }
}

impl Catalog {
    pub fn new(settings: CatalogSettings) -> Self {
        Self {
            tree: CatalogTree::new(),
            index: SuggestionIndex::new(settings.max_prefix_len),
            settings,
        }
    }

    /// Builds a catalog from `categories` with a freshly built index.
    pub fn with_categories(
        settings: CatalogSettings,
        categories: impl IntoIterator<Item = Category>,
    ) -> Self {
        let mut catalog = Self::new(settings);
        for category in categories {
            catalog.insert_category(category);
        }
        catalog.rebuild_index();
        catalog
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub fn tree(&self) -> &CatalogTree {
        &self.tree
    }

    pub fn index(&self) -> &SuggestionIndex {
        &self.index
    }

    /// An empty category carrying the configured default popularity.
    pub fn new_category(&self, name: impl Into<String>) -> Category {
        Category::new(name).with_popularity(self.settings.default_popularity)
    }

    pub fn insert_category(&mut self, category: Category) {
        let name = category.name().to_owned();
        let before = self.tree.len();
        self.tree.insert(category);
        if self.tree.len() > before {
            info!(
                event_name = "catalog.category.inserted",
                category = %name,
                category_count = self.tree.len(),
                "category inserted"
            );
        } else {
            debug!(
                event_name = "catalog.category.duplicate_ignored",
                category = %name,
                "category already present; insert ignored"
            );
        }
    }

    pub fn find_category(&self, name: &str) -> Option<&Category> {
        self.tree.search(name)
    }

    pub fn remove_category(&mut self, name: &str) -> bool {
        let removed = self.tree.remove(name);
        if removed {
            info!(
                event_name = "catalog.category.removed",
                category = %name,
                category_count = self.tree.len(),
                "category removed"
            );
        }
        removed
    }

    pub fn list_all_categories(&self) -> Vec<&Category> {
        self.tree.list_all()
    }

    pub fn category_count(&self) -> usize {
        self.tree.len()
    }

    pub fn dump_tree(&self) -> String {
        dump::render(&self.tree)
    }

    pub fn rebuild_index(&mut self) {
        let started = Instant::now();
        self.index.rebuild(&self.tree);
        debug!(
            event_name = "suggestions.index.rebuilt",
            revision = self.tree.revision(),
            products = self.index.indexed_product_count(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "suggestion index rebuilt"
        );
    }

    pub fn index_state(&self) -> IndexState {
        self.index.state(self.tree.revision())
    }

    /// Ranked suggestions for `prefix`, at most `limit` of them.
    ///
    /// The top result is credited with the query scoring rules and the index
    /// is rebuilt afterwards, so repeating a query can reorder its results.
    pub fn suggest(&mut self, prefix: &str, limit: usize) -> Vec<Suggestion> {
        let started = Instant::now();
        if prefix.is_empty() {
            return Vec::new();
        }

        let state = self.index_state();
        if state != IndexState::Built && self.settings.auto_rebuild_stale {
            warn!(
                event_name = "suggestions.index.stale",
                state = state.as_str(),
                "suggestion index out of date; rebuilding before query"
            );
            self.rebuild_index();
        }

        let ranked = suggestions::rank(&self.tree, self.index.candidates(prefix), limit);
        if let Some(top) = ranked.first() {
            suggestions::apply_query_credit(&mut self.tree, top, &self.settings.query_credit);
            self.rebuild_index();
        }

        info!(
            event_name = "suggestions.query.served",
            prefix = %prefix,
            results = ranked.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "suggestions served"
        );
        ranked
    }

    /// [`Catalog::suggest`] with the configured default limit.
    pub fn suggest_default(&mut self, prefix: &str) -> Vec<Suggestion> {
        self.suggest(prefix, self.settings.default_limit)
    }

    pub fn list_all_products(&self) -> Vec<ProductListing> {
        suggestions::flat_product_list(&self.tree)
    }

    pub fn performance_report(&self) -> PerformanceReport {
        suggestions::performance_report(&self.tree)
    }

    /// Direct lookup that counts as a visit: the category gains
    /// [`VISIT_CREDIT`] popularity, uncapped.
    pub fn visit_category(&mut self, name: &str) -> Option<&Category> {
        let started = Instant::now();
        let Some(category) = self.tree.search_mut(name) else {
            warn!(event_name = "catalog.category.visit_missed", category = %name, "category not found");
            return None;
        };
        category.score_popularity(VISIT_CREDIT);
        info!(
            event_name = "catalog.category.visited",
            category = %name,
            popularity = category.popularity(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "category visited"
        );
        Some(category)
    }

    pub fn locate_product(&self, category: &str, product: &str) -> Option<CategoryPath> {
        suggestions::locate_product(&self.tree, category, product)
    }

    /// Credits a confirmed product choice with the bounded selection rules.
    pub fn record_selection(&mut self, category: &str, product: &str) -> Option<SelectionOutcome> {
        let outcome = suggestions::apply_selection(
            &mut self.tree,
            category,
            product,
            &self.settings.selection_credit,
        )?;
        info!(
            event_name = "catalog.selection.recorded",
            product = %product,
            category_path = %outcome.category_path,
            category_popularity = outcome.category.after,
            product_weight = outcome.product.after,
            "product selection recorded"
        );
        Some(outcome)
    }

    /// Adds `subcategory` under the top-level `category`. Returns false only
    /// when the category does not exist; a sibling with the same exact name
    /// makes the call a no-op.
    pub fn add_subcategory(&mut self, category: &str, subcategory: Category) -> bool {
        match self.tree.search_mut(category) {
            Some(parent) => {
                parent.add_subcategory(subcategory);
                true
            }
            None => false,
        }
    }

    pub fn remove_subcategory(&mut self, category: &str, subcategory: &str) -> bool {
        self.tree
            .search_mut(category)
            .is_some_and(|parent| parent.remove_subcategory(subcategory))
    }

    /// Adds a product to a top-level category, or to one of its direct
    /// subcategories (matched ignoring case). Returns false when the target
    /// does not exist.
    pub fn add_product(&mut self, category: &str, subcategory: Option<&str>, product: &str) -> bool {
        let Some(parent) = self.tree.search_mut(category) else {
            return false;
        };
        let target = match subcategory {
            Some(name) => match parent.find_subcategory_ignore_case_mut(name) {
                Some(target) => target,
                None => return false,
            },
            None => parent,
        };
        target.add_product(product);
        true
    }

    /// Removes a product by exact name. Without a subcategory the top-level
    /// category is tried first, then each direct subcategory in order.
    pub fn remove_product(
        &mut self,
        category: &str,
        subcategory: Option<&str>,
        product: &str,
    ) -> bool {
        let Some(parent) = self.tree.search_mut(category) else {
            return false;
        };
        match subcategory {
            Some(name) => parent
                .find_subcategory_ignore_case_mut(name)
                .is_some_and(|target| target.remove_product(product)),
            None => {
                parent.remove_product(product) || parent.remove_product_from_subcategories(product)
            }
        }
    }

    /// Replaces the whole catalog and rebuilds the index.
    pub fn reset(&mut self, categories: impl IntoIterator<Item = Category>) {
        self.tree.clear();
        for category in categories {
            self.tree.insert(category);
        }
        self.rebuild_index();
        info!(
            event_name = "catalog.reset",
            category_count = self.tree.len(),
            "catalog contents replaced"
        );
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.tree.validate()
    }
}

/// One catalog shared by independent front ends behind a single lock.
///
/// Reads run concurrently; mutations and suggestion queries, which adjust
/// weights, take the lock exclusively. A poisoned lock is recovered since
/// every catalog operation leaves the tree valid before it can panic.
#[derive(Clone, Debug, Default)]
pub struct SharedCatalog {
    inner: Arc<RwLock<Catalog>>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self { inner: Arc::new(RwLock::new(catalog)) }
    }

    pub fn read<R>(&self, reader: impl FnOnce(&Catalog) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        reader(&guard)
    }

    pub fn write<R>(&self, writer: impl FnOnce(&mut Catalog) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        writer(&mut guard)
    }

    pub fn find_category(&self, name: &str) -> Option<Category> {
        self.read(|catalog| catalog.find_category(name).cloned())
    }

    pub fn list_all_categories(&self) -> Vec<Category> {
        self.read(|catalog| catalog.list_all_categories().into_iter().cloned().collect())
    }

    pub fn list_all_products(&self) -> Vec<ProductListing> {
        self.read(Catalog::list_all_products)
    }

    pub fn performance_report(&self) -> PerformanceReport {
        self.read(Catalog::performance_report)
    }

    pub fn dump_tree(&self) -> String {
        self.read(Catalog::dump_tree)
    }

    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<Suggestion> {
        self.write(|catalog| catalog.suggest(prefix, limit))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::{Catalog, CatalogSettings, SharedCatalog};
    use crate::domain::category::Category;
    use crate::fixtures::demo_categories;
    use crate::suggestions::IndexState;

    const EPSILON: f64 = 1e-9;

    fn demo() -> Catalog {
        Catalog::with_categories(CatalogSettings::default(), demo_categories())
    }

    fn manual_rebuild() -> CatalogSettings {
        CatalogSettings { auto_rebuild_stale: false, ..CatalogSettings::default() }
    }

    fn popularity(catalog: &Catalog, name: &str) -> f64 {
        catalog.find_category(name).map(Category::popularity).unwrap_or_default()
    }

    fn weight(category: Option<&Category>, product: &str) -> f64 {
        category.and_then(|c| c.product(product)).map(|p| p.weight).unwrap_or_default()
    }

    #[test]
    fn repeated_query_chains_from_updated_weights() {
        let mut catalog = demo();

        let first = catalog.suggest("CEL", 10);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].product_name, "Celular");
        assert_eq!(first[0].category_path.to_string(), "Eletrônicos");
        assert!((popularity(&catalog, "Eletrônicos") - 3.002).abs() < EPSILON);
        assert!((weight(catalog.find_category("Eletrônicos"), "Celular") - 1.001).abs() < EPSILON);

        catalog.suggest("cel", 10);
        assert!((popularity(&catalog, "Eletrônicos") - 3.004).abs() < EPSILON);
        assert!((weight(catalog.find_category("Eletrônicos"), "Celular") - 1.002).abs() < EPSILON);
    }

    #[test]
    fn top_result_follows_category_popularity() {
        let mut catalog = demo();
        let results = catalog.suggest("banana", 3);

        let names: Vec<_> = results.iter().map(|s| s.product_name.as_str()).collect();
        assert_eq!(names, vec!["Banana Chips", "Banana Passa", "Banana Flambada"]);
        assert!((popularity(&catalog, "Bananinha") - 5.002).abs() < EPSILON);
        let gourmet = catalog.find_category("Bananinha").and_then(|c| c.subcategory("Bananas Gourmet"));
        assert_eq!(gourmet.map(Category::popularity), Some(2.0));
    }

    #[test]
    fn empty_prefix_and_unknown_prefix_change_nothing() {
        let mut catalog = demo();
        assert!(catalog.suggest("", 5).is_empty());
        assert!(catalog.suggest("xyz", 5).is_empty());
        assert!(catalog.suggest("CELULAR PRO MAX", 5).is_empty());
        assert_eq!(popularity(&catalog, "Eletrônicos"), 3.0);
    }

    #[test]
    fn explicit_rebuild_after_mutation_is_the_baseline_contract() {
        let mut catalog = Catalog::with_categories(manual_rebuild(), demo_categories());
        assert_eq!(catalog.index_state(), IndexState::Built);

        assert!(catalog.add_product("Bebidas", None, "Cerveja"));
        assert_eq!(catalog.index_state(), IndexState::Stale);
        assert!(catalog.suggest("CER", 5).is_empty(), "stale index serves old contents");

        catalog.rebuild_index();
        let results = catalog.suggest("CER", 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category_path.to_string(), "Bebidas");
    }

    #[test]
    fn stale_index_is_rebuilt_before_serving_when_enabled() {
        let mut catalog = demo();
        catalog.insert_category(Category::with_products("Frutas", ["Caju"], 1.0));
        assert_eq!(catalog.index_state(), IndexState::Stale);

        let results = catalog.suggest("caj", 5);
        assert_eq!(results.len(), 1);
        assert_eq!(catalog.index_state(), IndexState::Built);
    }

    #[test]
    fn scoring_adjustments_exceed_the_bounded_ceiling_under_repeated_queries() {
        let mut catalog = Catalog::with_categories(
            CatalogSettings::default(),
            [Category::with_products("Frutas", ["Caju"], 9.99)],
        );
        for _ in 0..10 {
            catalog.suggest("CA", 5);
        }

        assert!(popularity(&catalog, "Frutas") > 10.0);
    }

    #[test]
    fn selection_is_bounded_and_visit_is_not() {
        let mut catalog = demo();

        let outcome = catalog.record_selection("Eletrônicos", "Mouse Gamer").expect("located");
        assert_eq!(outcome.category_path.to_string(), "Eletrônicos > Acessórios");
        assert!((outcome.category.after - 3.008).abs() < EPSILON);
        assert!(catalog.record_selection("Eletrônicos", "Geladeira").is_none());
        assert!(catalog.record_selection("Frutas", "Caju").is_none());

        for _ in 0..10 {
            catalog.visit_category("Bananinha");
        }
        assert_eq!(popularity(&catalog, "Bananinha"), 15.0);
        assert!(catalog.visit_category("Frutas").is_none());
    }

    #[test]
    fn product_mutations_follow_subcategory_rules() {
        let mut catalog = demo();

        assert!(catalog.add_product("Eletrônicos", Some("acessórios"), "Webcam"));
        assert!(!catalog.add_product("Eletrônicos", Some("Cabos"), "Cabo USB"));
        assert!(!catalog.add_product("Frutas", None, "Caju"));

        assert!(catalog.remove_product("Eletrônicos", None, "Mouse Gamer"));
        assert!(!catalog.remove_product("Eletrônicos", Some("Acessórios"), "Mouse Gamer"));
        assert!(catalog.remove_product("Eletrônicos", Some("ACESSÓRIOS"), "Webcam"));

        let accessories =
            catalog.find_category("Eletrônicos").and_then(|c| c.subcategory("Acessórios"));
        let names: Vec<_> =
            accessories.map(|c| c.products().iter().map(|p| p.name.clone()).collect()).unwrap_or_default();
        assert_eq!(names, vec!["Cabo HDMI".to_owned()]);
    }

    #[test]
    fn subcategory_mutations() {
        let mut catalog = demo();

        assert!(catalog.add_subcategory("Bebidas", Category::new("Sucos")));
        assert!(!catalog.add_subcategory("Frutas", Category::new("Secas")));
        assert!(catalog.remove_subcategory("Bebidas", "SUCOS"));
        assert!(!catalog.remove_subcategory("Bebidas", "Sucos"));
        assert_eq!(catalog.new_category("Frutas").popularity(), 1.0);
    }

    #[test]
    fn flat_listing_matches_product_totals() {
        let catalog = demo();
        let listings = catalog.list_all_products();
        assert_eq!(listings.len(), 12);
        assert!(listings
            .windows(2)
            .all(|pair| pair[0].popularity_weight >= pair[1].popularity_weight));
    }

    #[test]
    fn reset_restores_given_contents() {
        let mut catalog = demo();
        catalog.remove_category("Bebidas");
        catalog.suggest("CEL", 5);

        catalog.reset(demo_categories());

        assert_eq!(catalog.category_count(), 3);
        assert_eq!(popularity(&catalog, "Eletrônicos"), 3.0);
        assert_eq!(catalog.index_state(), IndexState::Built);
        assert_eq!(catalog.validate(), Ok(()));
    }

    #[test]
    fn report_and_dump_describe_the_demo_tree() {
        let catalog = demo();
        let report = catalog.performance_report();
        assert_eq!((report.category_count, report.height, report.balanced), (3, 2, true));
        assert!(catalog.dump_tree().contains("Total: 3 categories"));
    }

    #[test]
    fn shared_catalog_serializes_concurrent_writers() {
        let shared = SharedCatalog::new(demo());

        thread::scope(|scope| {
            for worker in 0..4 {
                let shared = shared.clone();
                scope.spawn(move || {
                    for item in 0..25 {
                        shared.write(|catalog| {
                            catalog.insert_category(Category::with_products(
                                format!("worker-{worker}-{item:02}"),
                                [format!("Produto {worker}-{item}")],
                                1.0,
                            ));
                            catalog.rebuild_index();
                        });
                        shared.suggest("cel", 3);
                    }
                });
            }
            for _ in 0..2 {
                let shared = shared.clone();
                scope.spawn(move || {
                    for _ in 0..25 {
                        let report = shared.performance_report();
                        assert!(report.balanced);
                    }
                });
            }
        });

        assert_eq!(shared.read(Catalog::category_count), 103);
        assert_eq!(shared.read(Catalog::validate), Ok(()));
        assert!((popularity_of(&shared, "Eletrônicos") - (3.0 + 100.0 * 0.002)).abs() < 1e-6);
    }

    fn popularity_of(shared: &SharedCatalog, name: &str) -> f64 {
        shared.find_category(name).map(|c| c.popularity()).unwrap_or_default()
    }
}
