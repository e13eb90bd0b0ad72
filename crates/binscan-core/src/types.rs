//! Shared types and OpenAPI schemas.
//!
//! Domain types live in their own modules (bins, proximity, history, rewards);
//! this module holds the few types that describe the service itself.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "bins": 3,
    "codes": 3
}))]
pub struct HealthResponse {
    /// Service status.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Bins currently registered.
    #[schema(example = 3)]
    pub bins: usize,

    /// Codes recognized (bundled and user).
    #[schema(example = 3)]
    pub codes: usize,
}
