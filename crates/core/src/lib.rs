pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod service;
pub mod suggestions;

pub use catalog::CatalogTree;
pub use domain::category::{Category, Product};
pub use domain::path::CategoryPath;
pub use errors::{DomainError, InterfaceError};
pub use service::{Catalog, CatalogSettings, SharedCatalog};
pub use suggestions::{
    IndexState, PerformanceReport, ProductListing, SelectionOutcome, Suggestion, SuggestionIndex,
    WeightChange,
};
