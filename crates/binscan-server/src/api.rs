//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `bins` - Bin listing, radius and progressive search, geofence, dropped pins
//! - `codes` - Recognized QR codes
//! - `scans` - Scan submission and history
//! - `rewards` - Rewards catalog
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod bins;
pub mod codes;
pub mod error;
pub mod health;
pub mod openapi;
pub mod rewards;
pub mod scans;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /docs                  - Swagger UI
/// /api
/// ├── /bins              - Bin list, dropped pins, nearby, search, geofence
/// ├── /search/radii      - Preset radius menu
/// ├── /codes             - Recognized QR codes
/// ├── /scans             - Scan submission and history
/// ├── /rewards           - Rewards catalog
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                // OpenAPI spec at /api/openapi.json
                .route("/openapi.json", get(openapi::get_openapi_spec))
                // Search radius menu at /api/search/radii
                .route("/search/radii", get(bins::get_radii))
                .nest("/bins", bins::router())
                .nest("/codes", codes::router())
                .nest("/scans", scans::router())
                .nest("/rewards", rewards::router()),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
