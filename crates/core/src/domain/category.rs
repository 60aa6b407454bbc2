use serde::{Deserialize, Serialize};

/// Popularity a category starts with when none is given.
pub const DEFAULT_POPULARITY: f64 = 1.0;
/// Weight a product starts with when none is given.
pub const DEFAULT_PRODUCT_WEIGHT: f64 = 1.0;
/// Ceiling applied by the bounded adjustments.
pub const MAX_BOUNDED_WEIGHT: f64 = 10.0;
/// Default step for [`Category::increase_popularity`].
pub const DEFAULT_POPULARITY_STEP: f64 = 0.05;
/// Default step for [`Category::increase_product_weight`].
pub const DEFAULT_PRODUCT_WEIGHT_STEP: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub weight: f64,
}

impl Product {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self { name: name.into(), weight }
    }
}

/// A named node of the catalog hierarchy.
///
/// Products keep insertion order and are unique by exact name. Subcategories
/// form a plain ordered list, unique by exact name among siblings, and may
/// nest to any depth. The name is fixed at construction because the catalog
/// tree orders top-level categories by it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    name: String,
    popularity: f64,
    products: Vec<Product>,
    subcategories: Vec<Category>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            popularity: DEFAULT_POPULARITY,
            products: Vec::new(),
            subcategories: Vec::new(),
        }
    }

    /// Builds a category from product names, each at [`DEFAULT_PRODUCT_WEIGHT`].
    pub fn with_products<I, S>(name: impl Into<String>, products: I, popularity: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut category = Self::new(name).with_popularity(popularity);
        for product in products {
            category.add_product(product);
        }
        category
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn with_subcategory(mut self, subcategory: Category) -> Self {
        self.add_subcategory(subcategory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn popularity(&self) -> f64 {
        self.popularity
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn subcategories(&self) -> &[Category] {
        &self.subcategories
    }

    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.name == name)
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Products of this category and of every nested subcategory.
    pub fn total_product_count(&self) -> usize {
        self.products.len()
            + self.subcategories.iter().map(Category::total_product_count).sum::<usize>()
    }

    pub fn add_product(&mut self, name: impl Into<String>) {
        self.add_weighted_product(name, DEFAULT_PRODUCT_WEIGHT);
    }

    /// Appends a product unless one with the exact same name exists.
    pub fn add_weighted_product(&mut self, name: impl Into<String>, weight: f64) {
        let name = name.into();
        if self.product(&name).is_none() {
            self.products.push(Product { name, weight });
        }
    }

    pub fn remove_product(&mut self, name: &str) -> bool {
        match self.products.iter().position(|product| product.name == name) {
            Some(index) => {
                self.products.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes the product from the first direct subcategory holding it.
    pub fn remove_product_from_subcategories(&mut self, name: &str) -> bool {
        self.subcategories.iter_mut().any(|subcategory| subcategory.remove_product(name))
    }

    /// Products ordered by weight, heaviest first. Equal weights keep
    /// insertion order.
    pub fn sorted_products_by_weight(&self) -> Vec<&Product> {
        let mut sorted: Vec<&Product> = self.products.iter().collect();
        sorted.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        sorted
    }

    pub fn subcategory(&self, name: &str) -> Option<&Category> {
        self.subcategories.iter().find(|subcategory| subcategory.name == name)
    }

    pub fn subcategory_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.subcategories.iter_mut().find(|subcategory| subcategory.name == name)
    }

    pub fn find_subcategory_ignore_case(&self, name: &str) -> Option<&Category> {
        let wanted = name.to_lowercase();
        self.subcategories.iter().find(|subcategory| subcategory.name.to_lowercase() == wanted)
    }

    pub fn find_subcategory_ignore_case_mut(&mut self, name: &str) -> Option<&mut Category> {
        let wanted = name.to_lowercase();
        self.subcategories.iter_mut().find(|subcategory| subcategory.name.to_lowercase() == wanted)
    }

    /// Walks nested subcategories by exact name. An empty path is `self`.
    pub fn descendant<S: AsRef<str>>(&self, path: &[S]) -> Option<&Category> {
        path.iter().try_fold(self, |current, segment| current.subcategory(segment.as_ref()))
    }

    pub fn descendant_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Category> {
        let mut current = self;
        for segment in path {
            current = current.subcategory_mut(segment.as_ref())?;
        }
        Some(current)
    }

    /// Appends a subcategory unless a sibling with the exact same name exists.
    pub fn add_subcategory(&mut self, subcategory: Category) {
        if self.subcategory(&subcategory.name).is_none() {
            self.subcategories.push(subcategory);
        }
    }

    /// Removes the first direct subcategory whose name matches ignoring case.
    pub fn remove_subcategory(&mut self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        match self.subcategories.iter().position(|sub| sub.name.to_lowercase() == wanted) {
            Some(index) => {
                self.subcategories.remove(index);
                true
            }
            None => false,
        }
    }

    // Bounded adjustments: never push a value above MAX_BOUNDED_WEIGHT.

    pub fn increase_popularity(&mut self, delta: f64) {
        self.popularity = (self.popularity + delta).min(MAX_BOUNDED_WEIGHT);
    }

    /// Matches the product name ignoring case. Returns whether a product was found.
    pub fn increase_product_weight(&mut self, product_name: &str, delta: f64) -> bool {
        let wanted = product_name.to_lowercase();
        match self.products.iter_mut().find(|product| product.name.to_lowercase() == wanted) {
            Some(product) => {
                product.weight = (product.weight + delta).min(MAX_BOUNDED_WEIGHT);
                true
            }
            None => false,
        }
    }

    // Scoring adjustments: uncapped, driven by suggestion traffic.

    pub fn score_popularity(&mut self, delta: f64) {
        self.popularity += delta;
    }

    /// Exact product name match. Returns whether a product was found.
    pub fn score_product_weight(&mut self, product_name: &str, delta: f64) -> bool {
        match self.products.iter_mut().find(|product| product.name == product_name) {
            Some(product) => {
                product.weight += delta;
                true
            }
            None => false,
        }
    }

    /// Exact subcategory name match among direct children.
    pub fn score_subcategory_popularity(&mut self, subcategory_name: &str, delta: f64) -> bool {
        match self.subcategory_mut(subcategory_name) {
            Some(subcategory) => {
                subcategory.score_popularity(delta);
                true
            }
            None => false,
        }
    }
}
