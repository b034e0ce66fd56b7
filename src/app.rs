use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::handlers::{self, AppState};

pub fn app(state: AppState, api: &ApiConfig) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(handlers::health::get))
        .merge(load_routes())
        .merge(product_routes())
        .merge(operation_routes())
        .layer(DefaultBodyLimit::max(api.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    let router = if api.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

fn load_routes() -> Router<AppState> {
    Router::new().route("/api/load", post(handlers::load::post))
}

fn product_routes() -> Router<AppState> {
    use handlers::products;

    Router::new()
        // Collection
        .route("/api/products", get(products::products_get).post(products::products_post))
        .route("/api/products/find", post(products::products_find))
        // Single record
        .route(
            "/api/products/:id",
            get(products::record_get)
                .put(products::record_put)
                .delete(products::record_delete),
        )
}

fn operation_routes() -> Router<AppState> {
    Router::new().route("/api/operations", get(handlers::operations::get))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Polaris Backend",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "GET /health",
                "load": "POST /api/load (CSV body)",
                "products": "GET|POST /api/products, POST /api/products/find",
                "product": "GET|PUT|DELETE /api/products/:id",
                "operations": "GET /api/operations",
            }
        }
    }))
}
