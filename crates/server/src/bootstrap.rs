use arbor_core::config::{AppConfig, ConfigError};
use arbor_core::fixtures::demo_categories;
use arbor_core::{Catalog, CatalogSettings, DomainError, SharedCatalog};
use axum::Router;
use thiserror::Error;
use tracing::info;

use crate::{api, health};

pub struct Application {
    pub config: AppConfig,
    pub catalog: SharedCatalog,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("seeded catalog failed validation: {0}")]
    Invariant(#[from] DomainError),
}

impl Application {
    /// Health and API routes over this application's catalog.
    pub fn router(&self) -> Router {
        let state = api::ApiState {
            catalog: self.catalog.clone(),
            default_page_size: self.config.server.default_page_size,
        };
        health::router(self.catalog.clone()).merge(api::router(state))
    }
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        seed_demo_data = config.catalog.seed_demo_data,
        "starting application bootstrap"
    );

    let settings = CatalogSettings::from(&config);
    let catalog = if config.catalog.seed_demo_data {
        Catalog::with_categories(settings, demo_categories())
    } else {
        Catalog::new(settings)
    };
    catalog.validate()?;

    info!(
        event_name = "system.bootstrap.catalog_ready",
        correlation_id = "bootstrap",
        category_count = catalog.category_count(),
        index_state = catalog.index_state().as_str(),
        "catalog initialized"
    );

    Ok(Application { config, catalog: SharedCatalog::new(catalog) })
}
