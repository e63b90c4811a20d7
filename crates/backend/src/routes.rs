use std::sync::Arc;

use axum::http::{header, Method};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};

use crate::domain::a001_product::repository::{ProductRepository, SqlProductRepository};
use crate::domain::a001_product::service::ProductService;
use crate::handlers;
use crate::system::middleware::request_logger::request_logger;

/// Состояние приложения, общее для всех запросов
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<ProductService>,
}

impl AppState {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self::with_repository(Arc::new(SqlProductRepository::new(conn)))
    }

    pub fn with_repository(repository: Arc<dyn ProductRepository>) -> Self {
        Self {
            products: Arc::new(ProductService::new(repository)),
        }
    }
}

pub fn configure_routes() -> Router<AppState> {
    Router::new()
        // ========================================
        // PRODUCT
        // ========================================
        .route(
            "/api/product",
            get(handlers::a001_product::list_all).post(handlers::a001_product::create),
        )
        .route(
            "/api/product/:id",
            get(handlers::a001_product::get_by_id)
                .put(handlers::a001_product::update)
                .delete(handlers::a001_product::delete),
        )
        .route(
            "/api/product/:id/availability/:quantity",
            get(handlers::a001_product::check_availability),
        )
}

/// Полный роутер: API, health, CORS и логирование запросов
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::LOCATION]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(configure_routes())
        .layer(middleware::from_fn(request_logger))
        .layer(cors)
        .with_state(state)
}
