//! JSON API over the shared catalog.
//!
//! Every mutating handler rebuilds the suggestion index before releasing the
//! write lock, so readers never observe a mutation without its index.

use std::collections::BTreeMap;

use arbor_core::fixtures::demo_categories;
use arbor_core::{
    Category, InterfaceError, Product, ProductListing, SelectionOutcome, SharedCatalog, Suggestion,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result limit for `/api/products/search` when `limit` is absent.
pub const DEFAULT_SEARCH_LIMIT: usize = 15;

#[derive(Clone)]
pub struct ApiState {
    pub catalog: SharedCatalog,
    pub default_page_size: usize,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/search", get(search_products))
        .route("/api/products/{category}/{product}", put(select_product).delete(delete_product))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/{name}", get(get_category).delete(delete_category))
        .route(
            "/api/categories/{name}/subcategories",
            get(list_subcategories).post(create_subcategory),
        )
        .route("/api/categories/{name}/subcategories/{subcategory}", delete(delete_subcategory))
        .route("/api/collection", get(get_collection))
        .route("/api/collection/reset", post(reset_collection))
        .route("/api/stats", get(get_stats))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError(InterfaceError);

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub correlation_id: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self(InterfaceError::bad_request(message, new_correlation_id()))
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self(InterfaceError::not_found(message, new_correlation_id()))
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self(InterfaceError::conflict(message, new_correlation_id()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %self.0.correlation_id(),
                error = %self.0,
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request.rejected",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: self.0.user_message(),
            message: self.0.message().to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trimmed required field; blank values are a bad request naming the field.
fn required<'a>(value: &'a str, field: &str) -> ApiResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("`{field}` is required")));
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub subcategory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<ProductListing>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<Suggestion>,
    pub total: usize,
}

/// Acknowledgement for mutations that have nothing else to return.
#[derive(Debug, Serialize)]
pub struct Confirmation {
    pub message: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub message: String,
    pub product: String,
    pub increments: SelectionOutcome,
}

#[derive(Debug, Serialize)]
pub struct CategoryBrief {
    pub name: String,
    pub popularity: f64,
}

#[derive(Debug, Serialize)]
pub struct CategoryCreated {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub category: CategoryBrief,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub popularity: f64,
    pub product_count: usize,
    pub subcategory_count: usize,
    pub subcategories: Vec<String>,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name().to_string(),
            popularity: category.popularity(),
            product_count: category.product_count(),
            subcategory_count: category.subcategories().len(),
            subcategories: category.subcategories().iter().map(|s| s.name().to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<CategorySummary>,
    pub total: usize,
}

/// A category with products heaviest first and its subcategories, recursively.
#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    pub name: String,
    pub popularity: f64,
    pub products: Vec<Product>,
    pub subcategories: Vec<CategoryDetail>,
}

impl From<&Category> for CategoryDetail {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name().to_string(),
            popularity: category.popularity(),
            products: category.sorted_products_by_weight().into_iter().cloned().collect(),
            subcategories: category.subcategories().iter().map(CategoryDetail::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubcategorySummary {
    pub name: String,
    pub popularity: f64,
    pub product_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SubcategoryList {
    pub category: String,
    pub subcategories: Vec<SubcategorySummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CollectionMetadata {
    pub category_count: usize,
    pub tree_height: usize,
    pub balanced: bool,
    pub product_count: usize,
    pub complexity: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct CollectionResponse {
    pub metadata: CollectionMetadata,
    pub categories: Vec<CategoryDetail>,
}

#[derive(Debug, Serialize)]
pub struct TreeStats {
    pub height: usize,
    pub balanced: bool,
    pub category_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProductStats {
    pub total: usize,
    pub categories_with_products: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub tree: TreeStats,
    pub products: ProductStats,
    pub index_state: &'static str,
    pub complexity: BTreeMap<&'static str, &'static str>,
    pub generated_at: String,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub async fn list_products(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ProductPage>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(state.default_page_size);
    if page == 0 || limit == 0 {
        return Err(ApiError::bad_request("`page` and `limit` must be positive"));
    }

    let listings = state.catalog.list_all_products();
    let total = listings.len();
    let products =
        listings.into_iter().skip((page - 1).saturating_mul(limit)).take(limit).collect();

    Ok(Json(ProductPage { products, total, page, limit, total_pages: total.div_ceil(limit) }))
}

pub async fn search_products(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let prefix = required(query.q.as_deref().unwrap_or_default(), "q")?;
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if limit == 0 {
        return Err(ApiError::bad_request("`limit` must be positive"));
    }

    let results = state.catalog.suggest(prefix, limit);
    Ok(Json(SearchResponse { query: prefix.to_string(), total: results.len(), results }))
}

pub async fn create_product(
    State(state): State<ApiState>,
    Json(body): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Confirmation>)> {
    let name = required(&body.name, "name")?;
    let category = required(&body.category, "category")?;
    let subcategory = body.subcategory.as_deref().map(str::trim).filter(|s| !s.is_empty());

    state.catalog.write(|catalog| {
        let parent = catalog
            .find_category(category)
            .ok_or_else(|| ApiError::not_found(format!("category `{category}` not found")))?;
        if let Some(subcategory) = subcategory {
            if parent.find_subcategory_ignore_case(subcategory).is_none() {
                return Err(ApiError::not_found(format!(
                    "subcategory `{subcategory}` not found in `{category}`"
                )));
            }
        }
        catalog.add_product(category, subcategory, name);
        catalog.rebuild_index();
        Ok(())
    })?;

    info!(
        event_name = "api.product.created",
        product = %name,
        category = %category,
        subcategory = subcategory.unwrap_or_default(),
        "product created"
    );
    Ok((
        StatusCode::CREATED,
        Json(Confirmation {
            message: "product created".to_string(),
            category: category.to_string(),
            subcategory: subcategory.map(str::to_string),
            product: Some(name.to_string()),
        }),
    ))
}

/// Records that a user picked `product`, applying the selection credit.
pub async fn select_product(
    State(state): State<ApiState>,
    Path((category, product)): Path<(String, String)>,
) -> ApiResult<Json<SelectionResponse>> {
    let outcome = state.catalog.write(|catalog| {
        if catalog.find_category(&category).is_none() {
            return Err(ApiError::not_found(format!("category `{category}` not found")));
        }
        let outcome = catalog
            .record_selection(&category, &product)
            .ok_or_else(|| ApiError::not_found(format!("product `{product}` not found")))?;
        catalog.rebuild_index();
        Ok(outcome)
    })?;

    Ok(Json(SelectionResponse {
        message: "selection recorded".to_string(),
        product,
        increments: outcome,
    }))
}

pub async fn delete_product(
    State(state): State<ApiState>,
    Path((category, product)): Path<(String, String)>,
) -> ApiResult<Json<Confirmation>> {
    state.catalog.write(|catalog| {
        if catalog.find_category(&category).is_none() {
            return Err(ApiError::not_found(format!("category `{category}` not found")));
        }
        if !catalog.remove_product(&category, None, &product) {
            return Err(ApiError::not_found(format!("product `{product}` not found")));
        }
        catalog.rebuild_index();
        Ok(())
    })?;

    info!(event_name = "api.product.removed", product = %product, category = %category, "product removed");
    Ok(Json(Confirmation {
        message: "product removed".to_string(),
        category,
        subcategory: None,
        product: Some(product),
    }))
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub async fn list_categories(State(state): State<ApiState>) -> Json<CategoryList> {
    let categories: Vec<CategorySummary> =
        state.catalog.list_all_categories().iter().map(CategorySummary::from).collect();
    Json(CategoryList { total: categories.len(), categories })
}

pub async fn create_category(
    State(state): State<ApiState>,
    Json(body): Json<NameRequest>,
) -> ApiResult<(StatusCode, Json<CategoryCreated>)> {
    let name = required(&body.name, "name")?;

    let popularity = state.catalog.write(|catalog| {
        if catalog.find_category(name).is_some() {
            return Err(ApiError::conflict(format!("category `{name}` already exists")));
        }
        let category = catalog.new_category(name);
        let popularity = category.popularity();
        catalog.insert_category(category);
        catalog.rebuild_index();
        Ok(popularity)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryCreated {
            message: "category created".to_string(),
            parent: None,
            category: CategoryBrief { name: name.to_string(), popularity },
        }),
    ))
}

pub async fn get_category(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<CategoryDetail>> {
    state
        .catalog
        .read(|catalog| catalog.find_category(&name).map(CategoryDetail::from))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("category `{name}` not found")))
}

pub async fn delete_category(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Confirmation>> {
    state.catalog.write(|catalog| {
        if !catalog.remove_category(&name) {
            return Err(ApiError::not_found(format!("category `{name}` not found")));
        }
        catalog.rebuild_index();
        Ok(())
    })?;

    Ok(Json(Confirmation {
        message: "category removed".to_string(),
        category: name,
        subcategory: None,
        product: None,
    }))
}

// ---------------------------------------------------------------------------
// Subcategories
// ---------------------------------------------------------------------------

pub async fn list_subcategories(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<SubcategoryList>> {
    let subcategories = state
        .catalog
        .read(|catalog| {
            catalog.find_category(&name).map(|category| {
                category
                    .subcategories()
                    .iter()
                    .map(|sub| SubcategorySummary {
                        name: sub.name().to_string(),
                        popularity: sub.popularity(),
                        product_count: sub.product_count(),
                    })
                    .collect::<Vec<_>>()
            })
        })
        .ok_or_else(|| ApiError::not_found(format!("category `{name}` not found")))?;

    Ok(Json(SubcategoryList { category: name, total: subcategories.len(), subcategories }))
}

pub async fn create_subcategory(
    State(state): State<ApiState>,
    Path(category): Path<String>,
    Json(body): Json<NameRequest>,
) -> ApiResult<(StatusCode, Json<CategoryCreated>)> {
    let name = required(&body.name, "name")?;

    let popularity = state.catalog.write(|catalog| {
        let parent = catalog
            .find_category(&category)
            .ok_or_else(|| ApiError::not_found(format!("category `{category}` not found")))?;
        if parent.find_subcategory_ignore_case(name).is_some() {
            return Err(ApiError::conflict(format!(
                "subcategory `{name}` already exists in `{category}`"
            )));
        }
        let subcategory = catalog.new_category(name);
        let popularity = subcategory.popularity();
        catalog.add_subcategory(&category, subcategory);
        catalog.rebuild_index();
        Ok(popularity)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryCreated {
            message: "subcategory created".to_string(),
            parent: Some(category),
            category: CategoryBrief { name: name.to_string(), popularity },
        }),
    ))
}

pub async fn delete_subcategory(
    State(state): State<ApiState>,
    Path((category, subcategory)): Path<(String, String)>,
) -> ApiResult<Json<Confirmation>> {
    state.catalog.write(|catalog| {
        if catalog.find_category(&category).is_none() {
            return Err(ApiError::not_found(format!("category `{category}` not found")));
        }
        if !catalog.remove_subcategory(&category, &subcategory) {
            return Err(ApiError::not_found(format!(
                "subcategory `{subcategory}` not found in `{category}`"
            )));
        }
        catalog.rebuild_index();
        Ok(())
    })?;

    Ok(Json(Confirmation {
        message: "subcategory removed".to_string(),
        category,
        subcategory: Some(subcategory),
        product: None,
    }))
}

// ---------------------------------------------------------------------------
// Collection and stats
// ---------------------------------------------------------------------------

pub async fn get_collection(State(state): State<ApiState>) -> Json<CollectionResponse> {
    let response = state.catalog.read(|catalog| {
        let report = catalog.performance_report();
        CollectionResponse {
            metadata: CollectionMetadata {
                category_count: report.category_count,
                tree_height: report.height,
                balanced: report.balanced,
                product_count: catalog.list_all_products().len(),
                complexity: report.complexity_notes,
            },
            categories: catalog
                .list_all_categories()
                .into_iter()
                .map(CategoryDetail::from)
                .collect(),
        }
    });
    Json(response)
}

/// Replaces the catalog with the demonstration data.
pub async fn reset_collection(State(state): State<ApiState>) -> Json<CollectionMetadata> {
    state.catalog.write(|catalog| catalog.reset(demo_categories()));
    let Json(collection) = get_collection(State(state)).await;
    Json(collection.metadata)
}

pub async fn get_stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    let response = state.catalog.read(|catalog| {
        let report = catalog.performance_report();
        let categories_with_products = catalog
            .list_all_categories()
            .iter()
            .filter(|category| category.product_count() > 0)
            .count();
        StatsResponse {
            tree: TreeStats {
                height: report.height,
                balanced: report.balanced,
                category_count: report.category_count,
            },
            products: ProductStats {
                total: catalog.list_all_products().len(),
                categories_with_products,
            },
            index_state: catalog.index_state().as_str(),
            complexity: report.complexity_notes,
            generated_at: Utc::now().to_rfc3339(),
        }
    });
    Json(response)
}

#[cfg(test)]
mod tests {
    use arbor_core::fixtures::demo_categories;
    use arbor_core::{Catalog, CatalogSettings, SharedCatalog};
    use axum::{
        body::{to_bytes, Body},
        extract::{Path, Query, State},
        http::{Request, StatusCode},
        Json,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn state() -> ApiState {
        let catalog = Catalog::with_categories(CatalogSettings::default(), demo_categories());
        ApiState { catalog: SharedCatalog::new(catalog), default_page_size: 50 }
    }

    fn name(value: &str) -> Json<NameRequest> {
        Json(NameRequest { name: value.to_string() })
    }

    fn popularity(state: &ApiState, category: &str) -> f64 {
        state.catalog.find_category(category).map(|c| c.popularity()).unwrap_or_default()
    }

    #[tokio::test]
    async fn list_products_paginates_flat_listing() {
        let state = state();

        let Json(page) =
            list_products(State(state), Query(PageQuery { page: Some(3), limit: Some(5) }))
                .await
                .expect("valid page");

        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.products.len(), 2);
    }

    #[tokio::test]
    async fn list_products_rejects_zero_limit() {
        let error = list_products(State(state()), Query(PageQuery { page: None, limit: Some(0) }))
            .await
            .expect_err("zero limit");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_requires_query_and_credits_top_result() {
        let state = state();

        let error = search_products(
            State(state.clone()),
            Query(SearchQuery { q: Some("   ".to_string()), limit: None }),
        )
        .await
        .expect_err("blank query");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);

        let Json(response) = search_products(
            State(state.clone()),
            Query(SearchQuery { q: Some("cel".to_string()), limit: None }),
        )
        .await
        .expect("search succeeds");

        assert_eq!(response.total, 1);
        assert_eq!(response.results[0].product_name, "Celular");
        assert!((popularity(&state, "Eletrônicos") - 3.002).abs() < EPSILON);
    }

    #[tokio::test]
    async fn create_product_validates_targets_and_reindexes() {
        let state = state();
        let request = |name: &str, category: &str, subcategory: Option<&str>| {
            Json(CreateProductRequest {
                name: name.to_string(),
                category: category.to_string(),
                subcategory: subcategory.map(str::to_string),
            })
        };

        let blank = create_product(State(state.clone()), request(" ", "Bebidas", None)).await;
        assert_eq!(blank.expect_err("blank name").status(), StatusCode::BAD_REQUEST);

        let missing = create_product(State(state.clone()), request("Chá", "Padaria", None)).await;
        assert_eq!(missing.expect_err("unknown category").status(), StatusCode::NOT_FOUND);

        let missing_sub =
            create_product(State(state.clone()), request("Tablet", "Eletrônicos", Some("Tablets")))
                .await;
        assert_eq!(missing_sub.expect_err("unknown subcategory").status(), StatusCode::NOT_FOUND);

        let (status, Json(created)) = create_product(
            State(state.clone()),
            request("Teclado", "Eletrônicos", Some("acessórios")),
        )
        .await
        .expect("product created");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.product.as_deref(), Some("Teclado"));

        let suggestions = state.catalog.suggest("tec", 5);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].category_path.to_string(), "Eletrônicos > Acessórios");
    }

    #[tokio::test]
    async fn select_product_reports_bounded_increments() {
        let state = state();

        let Json(response) = select_product(
            State(state.clone()),
            Path(("Eletrônicos".to_string(), "Mouse Gamer".to_string())),
        )
        .await
        .expect("selection recorded");

        let outcome = response.increments;
        assert!((outcome.category.after - 3.008).abs() < EPSILON);
        assert!(outcome.subcategory.is_some_and(|sub| (sub.after - 2.003).abs() < EPSILON));
        assert!((outcome.product.after - outcome.product.before - 0.005).abs() < EPSILON);

        let missing = select_product(
            State(state),
            Path(("Eletrônicos".to_string(), "Geladeira".to_string())),
        )
        .await;
        assert_eq!(missing.expect_err("unknown product").status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_product_falls_back_to_subcategories() {
        let state = state();
        let path = || Path(("Bananinha".to_string(), "Banana Flambada".to_string()));

        delete_product(State(state.clone()), path()).await.expect("removed from subcategory");
        let again = delete_product(State(state.clone()), path()).await;
        assert_eq!(again.expect_err("already removed").status(), StatusCode::NOT_FOUND);
        assert!(state.catalog.suggest("banana f", 5).is_empty());
    }

    #[tokio::test]
    async fn create_category_rejects_blank_and_duplicate_names() {
        let state = state();

        let blank = create_category(State(state.clone()), name("  ")).await;
        assert_eq!(blank.expect_err("blank").status(), StatusCode::BAD_REQUEST);

        let duplicate = create_category(State(state.clone()), name("Bebidas")).await;
        assert_eq!(duplicate.expect_err("duplicate").status(), StatusCode::CONFLICT);

        let (status, Json(created)) =
            create_category(State(state.clone()), name("Papelaria")).await.expect("created");
        assert_eq!(status, StatusCode::CREATED);
        assert!((created.category.popularity - 1.0).abs() < EPSILON);

        let Json(list) = list_categories(State(state)).await;
        assert_eq!(list.total, 4);
        assert_eq!(list.categories[3].name, "Papelaria");
    }

    #[tokio::test]
    async fn get_category_sorts_products_and_nests_subcategories() {
        let state = state();
        state.catalog.write(|catalog| {
            catalog.record_selection("Bebidas", "Água Mineral");
        });

        let Json(detail) =
            get_category(State(state.clone()), Path("Bebidas".to_string())).await.expect("found");
        assert_eq!(detail.products[0].name, "Água Mineral");

        let Json(detail) =
            get_category(State(state.clone()), Path("Eletrônicos".to_string())).await.expect("found");
        assert_eq!(detail.subcategories.len(), 1);
        assert_eq!(detail.subcategories[0].products.len(), 2);

        let missing = get_category(State(state), Path("Padaria".to_string())).await;
        assert_eq!(missing.expect_err("unknown").status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn subcategory_routes_enforce_case_insensitive_uniqueness() {
        let state = state();

        let duplicate = create_subcategory(
            State(state.clone()),
            Path("Eletrônicos".to_string()),
            name("ACESSÓRIOS"),
        )
        .await;
        assert_eq!(duplicate.expect_err("duplicate").status(), StatusCode::CONFLICT);

        let (status, _) = create_subcategory(
            State(state.clone()),
            Path("Eletrônicos".to_string()),
            name("Games"),
        )
        .await
        .expect("created");
        assert_eq!(status, StatusCode::CREATED);

        delete_subcategory(
            State(state.clone()),
            Path(("Eletrônicos".to_string(), "acessórios".to_string())),
        )
        .await
        .expect("removed");

        let Json(list) = list_subcategories(State(state), Path("Eletrônicos".to_string()))
            .await
            .expect("listed");
        assert_eq!(list.total, 1);
        assert_eq!(list.subcategories[0].name, "Games");
    }

    #[tokio::test]
    async fn reset_restores_demo_data_and_stats_reflect_it() {
        let state = state();
        delete_category(State(state.clone()), Path("Bebidas".to_string())).await.expect("removed");

        let Json(stats) = get_stats(State(state.clone())).await;
        assert_eq!(stats.tree.category_count, 2);
        assert_eq!(stats.products.total, 9);

        let Json(metadata) = reset_collection(State(state.clone())).await;
        assert_eq!(metadata.category_count, 3);
        assert_eq!(metadata.product_count, 12);

        let Json(stats) = get_stats(State(state)).await;
        assert_eq!(stats.products.categories_with_products, 3);
        assert_eq!(stats.index_state, "built");
        assert!(stats.tree.balanced);
    }

    #[tokio::test]
    async fn router_renders_errors_as_json_with_correlation_id() {
        let app = router(state());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/categories/Padaria")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(payload["message"], "category `Padaria` not found");
        assert!(payload["correlation_id"].as_str().is_some_and(|id| id.len() == 36));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/products/search?q=ban&limit=2")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(payload["total"], 2);
        assert_eq!(payload["results"][0]["category_path"], "Bananinha");
    }
}
