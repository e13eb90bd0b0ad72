//! OpenAPI specification generation for the binscan API.
//!
//! The generated document is served at `/api/openapi.json`, rendered by the
//! Swagger UI at `/docs`, and written to disk by the `gen-openapi` binary for
//! client code generation.

use axum::Json;
use binscan_core::{Bin, BinId, Coordinate, HealthResponse, NearbyBin, RadiusExpansion, Reward, ScanRecord};
use utoipa::OpenApi;

use super::bins::{
    BinsResponse, DropPinRequest, DropPinResponse, ExpandingSearchResponse, GeofenceResponse,
    NearbyResponse, RadiiResponse,
};
use super::codes::{CodeValidityResponse, CodesResponse, RegisterCodeRequest, RegisterCodeResponse};
use super::error::ErrorResponse;
use super::rewards::RewardsResponse;
use super::scans::{ScanHistoryResponse, ScanStatus, SubmitScanRequest, SubmitScanResponse};

/// Serve the OpenAPI specification as JSON.
///
/// This endpoint is available at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a string (for writing to file).
/// Used by the gen-openapi binary.
#[must_use]
pub fn get_openapi_json() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// OpenAPI document for the binscan API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "binscan API",
        version = "0.1.0",
        description = r#"
Scan QR codes on trash bins and find bins near you.

## Overview

The mobile client owns the camera, the map, and the location provider. This
service owns the decisions:

- **Bin discovery**: which bins lie within a radius of the current position,
  with a progressive search that widens the radius until something is found
- **Geofence**: whether the user is close enough to a bin to scan it
- **Scan validation**: whether a decoded QR string belongs to a known bin
- **History**: a geotagged, timestamped log of accepted scans

## Not ready versus nothing found

Endpoints that need the user's position return **424 Failed Dependency** when
`latitude`/`longitude` are missing. A search that ran and found nothing is a
normal **200** response with `found: false`. Clients should keep the two apart:
the first means "wait for a location fix", the second means "try a wider
radius".

## Distances

All distances are great-circle (haversine) distances in meters with an Earth
radius of 6,371,000 m. A bin exactly on the radius boundary is included.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local binscan server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks"
        ),
        (
            name = "bins",
            description = "Bin listing, radius search, progressive search, and the scan geofence"
        ),
        (
            name = "codes",
            description = "Recognized QR codes: bundled and user-registered"
        ),
        (
            name = "scans",
            description = "Scan submission and the scan history"
        ),
        (
            name = "rewards",
            description = "Rewards catalog"
        )
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Bin endpoints
        super::bins::list_bins,
        super::bins::drop_pin,
        super::bins::nearby_bins,
        super::bins::expanding_search,
        super::bins::check_geofence,
        super::bins::get_radii,
        // Code endpoints
        super::codes::list_codes,
        super::codes::register_code,
        super::codes::check_code,
        // Scan endpoints
        super::scans::submit_scan,
        super::scans::get_history,
        // Reward endpoints
        super::rewards::list_rewards,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Domain types
            Coordinate,
            BinId,
            Bin,
            NearbyBin,
            RadiusExpansion,
            ScanRecord,
            Reward,
            // Bin types
            BinsResponse,
            DropPinRequest,
            DropPinResponse,
            NearbyResponse,
            ExpandingSearchResponse,
            GeofenceResponse,
            RadiiResponse,
            // Code types
            CodesResponse,
            RegisterCodeRequest,
            RegisterCodeResponse,
            CodeValidityResponse,
            // Scan types
            SubmitScanRequest,
            SubmitScanResponse,
            ScanStatus,
            ScanHistoryResponse,
            // Reward types
            RewardsResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "binscan API");
        assert!(spec.paths.paths.contains_key("/api/bins/nearby"));
        assert!(spec.paths.paths.contains_key("/api/scans"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"binscan API\""));
    }
}
