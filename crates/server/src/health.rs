use arbor_core::{IndexState, SharedCatalog};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    catalog: SharedCatalog,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub catalog: HealthCheck,
    pub checked_at: String,
}

pub fn router(catalog: SharedCatalog) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { catalog })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(&state.catalog);
    let ready = catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "arbor-server runtime initialized".to_string(),
        },
        catalog,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// Tree invariants must hold; a stale index is reported but still ready
/// since queries rebuild it on demand.
fn catalog_check(catalog: &SharedCatalog) -> HealthCheck {
    catalog.read(|catalog| match catalog.validate() {
        Ok(()) => {
            let index = catalog.index_state();
            let note = if index == IndexState::Built { "" } else { " (rebuild pending)" };
            HealthCheck {
                status: "ready",
                detail: format!(
                    "{} categories, index {}{note}",
                    catalog.category_count(),
                    index.as_str()
                ),
            }
        }
        Err(error) => HealthCheck { status: "degraded", detail: error.to_string() },
    })
}
