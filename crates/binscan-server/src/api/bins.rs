//! Bin discovery API endpoints.
//!
//! Every location-dependent endpoint takes `latitude` and `longitude` as
//! query parameters. When either is missing the client has no position fix
//! yet and the request fails with 424, which is different from a successful
//! search that found nothing (200 with `found: false`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use binscan_core::{
    proximity, Bin, Coordinate, ExpansionOutcome, GeofenceDecision, NearbyBin, RadiusExpansion,
    SearchOutcome,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Shown when a search ran and came back empty.
pub const NONE_IN_RANGE_MESSAGE: &str = "No trash bins found within the selected radius.";

/// Creates the bins router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_bins).post(drop_pin))
        .route("/nearby", get(nearby_bins))
        .route("/search", get(expanding_search))
        .route("/{id}/geofence", get(check_geofence))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// All registered bins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BinsResponse {
    /// Bins in registry order.
    pub bins: Vec<Bin>,

    /// Number of bins.
    #[schema(example = 3)]
    pub count: usize,
}

/// Request body for dropping a pin on the map.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({"latitude": 13.7372, "longitude": 100.5229}))]
pub struct DropPinRequest {
    /// Latitude in degrees.
    #[schema(example = 13.7372)]
    pub latitude: f64,

    /// Longitude in degrees.
    #[schema(example = 100.5229)]
    pub longitude: f64,
}

/// The bin created by a dropped pin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DropPinResponse {
    /// The new bin.
    pub bin: Bin,

    /// Whether the pin was written to storage and will survive a restart.
    #[schema(example = false)]
    pub persisted: bool,
}

/// Query parameters for a fixed-radius search.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct NearbyQuery {
    /// Current latitude. Omit when no position fix is available.
    #[param(example = 13.7367)]
    pub latitude: Option<f64>,

    /// Current longitude. Omit when no position fix is available.
    #[param(example = 100.5231)]
    pub longitude: Option<f64>,

    /// Search radius in meters. Defaults to the first preset radius.
    #[param(example = 250.0)]
    pub radius: Option<f64>,
}

/// Result of a fixed-radius search.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "found": true,
    "radius_meters": 200.0,
    "bins": [{"id": 2, "name": "Trash Bin 2", "latitude": 13.7380, "longitude": 100.5235, "distance_meters": 150.87}],
    "message": null
}))]
pub struct NearbyResponse {
    /// Whether any bin is in range.
    pub found: bool,

    /// Radius that was searched.
    pub radius_meters: f64,

    /// Matches in registry order, not sorted by distance.
    pub bins: Vec<NearbyBin>,

    /// User-facing message when nothing was found.
    #[schema(nullable)]
    pub message: Option<String>,
}

impl From<SearchOutcome> for NearbyResponse {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Found {
                radius_meters,
                bins,
            } => Self {
                found: true,
                radius_meters,
                bins,
                message: None,
            },
            SearchOutcome::NoneInRange { radius_meters } => Self {
                found: false,
                radius_meters,
                bins: Vec::new(),
                message: Some(NONE_IN_RANGE_MESSAGE.to_string()),
            },
        }
    }
}

/// Query parameters for a progressive search. Unset policy values fall back
/// to the configured expansion.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ExpandingQuery {
    /// Current latitude.
    #[param(example = 13.7367)]
    pub latitude: Option<f64>,

    /// Current longitude.
    #[param(example = 100.5231)]
    pub longitude: Option<f64>,

    /// First radius tried, in meters.
    #[param(example = 100.0)]
    pub initial: Option<f64>,

    /// Amount the radius grows after each empty pass, in meters.
    #[param(example = 100.0)]
    pub step: Option<f64>,

    /// Largest radius tried, in meters.
    #[param(example = 1000.0)]
    pub max: Option<f64>,
}

/// Result of a progressive search.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "found": true,
    "radius_meters": 200.0,
    "attempts": 2,
    "bins": [{"id": 2, "latitude": 13.7380, "longitude": 100.5235, "distance_meters": 150.87}],
    "message": null
}))]
pub struct ExpandingSearchResponse {
    /// Whether any bin was found before the maximum radius.
    pub found: bool,

    /// Radius of the final pass: the matching radius, or the maximum when
    /// nothing was found.
    pub radius_meters: f64,

    /// Passes made.
    pub attempts: u32,

    /// Matches at `radius_meters`, in registry order.
    pub bins: Vec<NearbyBin>,

    /// User-facing message when nothing was found.
    #[schema(nullable)]
    pub message: Option<String>,
}

impl From<ExpansionOutcome> for ExpandingSearchResponse {
    fn from(outcome: ExpansionOutcome) -> Self {
        match outcome {
            ExpansionOutcome::Found {
                radius_meters,
                bins,
                attempts,
            } => Self {
                found: true,
                radius_meters,
                attempts,
                bins,
                message: None,
            },
            ExpansionOutcome::Exhausted {
                max_radius_meters,
                attempts,
            } => Self {
                found: false,
                radius_meters: max_radius_meters,
                attempts,
                bins: Vec::new(),
                message: Some(NONE_IN_RANGE_MESSAGE.to_string()),
            },
        }
    }
}

/// Current position for a geofence check.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct PositionQuery {
    /// Current latitude.
    #[param(example = 13.7370)]
    pub latitude: Option<f64>,

    /// Current longitude.
    #[param(example = 100.5231)]
    pub longitude: Option<f64>,
}

/// Whether the caller may open the scanner for a bin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "bin_id": "2",
    "granted": false,
    "distance_meters": 150.87,
    "threshold_meters": 100.0,
    "notice": "You are too far from this bin (151 m away). Move within 100 meters to scan it."
}))]
pub struct GeofenceResponse {
    /// The bin that was checked.
    pub bin_id: String,

    /// Whether the caller is close enough to scan.
    pub granted: bool,

    /// Distance to the bin in meters.
    pub distance_meters: f64,

    /// Threshold that was enforced.
    pub threshold_meters: f64,

    /// Notice to show when access is refused.
    #[schema(nullable)]
    pub notice: Option<String>,
}

/// Radii offered by the search menu.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "preset_radii_meters": [100.0, 250.0, 500.0],
    "expansion": {"initial": 100.0, "step": 100.0, "max": 1000.0}
}))]
pub struct RadiiResponse {
    /// Preset radii in menu order. Any positive custom radius is also accepted.
    pub preset_radii_meters: Vec<f64>,

    /// Configured progressive search policy.
    pub expansion: RadiusExpansion,
}

// ============================================================================
// Handlers
// ============================================================================

/// List every registered bin.
#[utoipa::path(
    get,
    path = "/api/bins",
    tag = "bins",
    operation_id = "listBins",
    summary = "List all bins",
    description = "Returns the packaged bins followed by any dropped pins, in \
        registry order.",
    responses(
        (status = 200, description = "Bin list", body = BinsResponse)
    )
)]
pub async fn list_bins(State(state): State<SharedState>) -> Json<BinsResponse> {
    let state_guard = state.read().await;
    let bins = state_guard.bins.bins().to_vec();

    Json(BinsResponse {
        count: bins.len(),
        bins,
    })
}

/// Drop a pin on the map, registering a new bin at that position.
#[utoipa::path(
    post,
    path = "/api/bins",
    tag = "bins",
    operation_id = "dropPin",
    summary = "Add a bin at a map position",
    description = "Appends a bin with the next free numeric id. The pin is \
        written to storage only when `storage.persist_dropped_pins` is \
        enabled; if that write fails the pin is not kept.",
    request_body = DropPinRequest,
    responses(
        (status = 201, description = "Bin added", body = DropPinResponse),
        (status = 400, description = "Coordinate out of range", body = super::error::ErrorResponse),
        (status = 409, description = "No numeric bin id is free", body = super::error::ErrorResponse),
        (status = 500, description = "Failed to persist the pin", body = super::error::ErrorResponse)
    )
)]
pub async fn drop_pin(
    State(state): State<SharedState>,
    Json(request): Json<DropPinRequest>,
) -> ApiResult<(StatusCode, Json<DropPinResponse>)> {
    let position = Coordinate::new(request.latitude, request.longitude)?;

    let (bin, persisted) = state.write().await.drop_pin(position)?;

    Ok((StatusCode::CREATED, Json(DropPinResponse { bin, persisted })))
}

/// Find bins within a fixed radius.
#[utoipa::path(
    get,
    path = "/api/bins/nearby",
    tag = "bins",
    operation_id = "findNearbyBins",
    summary = "Find bins within a radius",
    description = "Returns bins whose great-circle distance from the given \
        position is at most `radius` meters, in registry order. A search \
        that finds nothing returns 200 with `found: false`; a missing \
        position returns 424.",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Search ran", body = NearbyResponse),
        (status = 400, description = "Invalid radius or coordinate", body = super::error::ErrorResponse),
        (status = 424, description = "No position fix yet", body = super::error::ErrorResponse)
    )
)]
pub async fn nearby_bins(
    State(state): State<SharedState>,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<Json<NearbyResponse>> {
    let origin = Coordinate::from_parts(query.latitude, query.longitude)?;

    let state_guard = state.read().await;
    let radius = query
        .radius
        .or_else(|| state_guard.config.search.preset_radii.first().copied())
        .unwrap_or(proximity::PRESET_RADII_METERS[0]);

    let outcome = proximity::search(origin, state_guard.bins.bins(), radius)?;
    Ok(Json(outcome.into()))
}

/// Widen the radius until a bin is found.
#[utoipa::path(
    get,
    path = "/api/bins/search",
    tag = "bins",
    operation_id = "searchBinsExpanding",
    summary = "Progressive radius search",
    description = "Searches at `initial` meters, then grows the radius by \
        `step` until a bin is found or the radius would exceed `max`. \
        Omitted policy values use the configured expansion.",
    params(ExpandingQuery),
    responses(
        (status = 200, description = "Search ran", body = ExpandingSearchResponse),
        (status = 400, description = "Invalid policy or coordinate", body = super::error::ErrorResponse),
        (status = 424, description = "No position fix yet", body = super::error::ErrorResponse)
    )
)]
pub async fn expanding_search(
    State(state): State<SharedState>,
    Query(query): Query<ExpandingQuery>,
) -> ApiResult<Json<ExpandingSearchResponse>> {
    let origin = Coordinate::from_parts(query.latitude, query.longitude)?;

    let state_guard = state.read().await;
    let configured = state_guard.config.search.expansion;
    let policy = RadiusExpansion {
        initial: query.initial.unwrap_or(configured.initial),
        step: query.step.unwrap_or(configured.step),
        max: query.max.unwrap_or(configured.max),
    };

    let outcome = proximity::search_expanding(origin, state_guard.bins.bins(), &policy)?;
    Ok(Json(outcome.into()))
}

/// Check whether the caller is close enough to scan a bin.
#[utoipa::path(
    get,
    path = "/api/bins/{id}/geofence",
    tag = "bins",
    operation_id = "checkGeofence",
    summary = "Check scan proximity for a bin",
    description = "Compares the caller's distance to the bin against the \
        configured geofence threshold. A refusal is a normal 200 response \
        carrying a notice for the user.",
    params(
        ("id" = String, Path, description = "Bin id"),
        PositionQuery
    ),
    responses(
        (status = 200, description = "Check ran", body = GeofenceResponse),
        (status = 404, description = "Unknown bin", body = super::error::ErrorResponse),
        (status = 424, description = "No position fix yet", body = super::error::ErrorResponse)
    )
)]
pub async fn check_geofence(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<PositionQuery>,
) -> ApiResult<Json<GeofenceResponse>> {
    let origin = Coordinate::from_parts(query.latitude, query.longitude)?;

    let state_guard = state.read().await;
    let bin = state_guard.bins.require(&id)?;
    let decision = state_guard.gate.check(origin, bin)?;

    let distance_meters = match decision {
        GeofenceDecision::Granted { distance_meters }
        | GeofenceDecision::TooFar {
            distance_meters, ..
        } => distance_meters,
    };

    Ok(Json(GeofenceResponse {
        bin_id: bin.id.to_string(),
        granted: decision.is_granted(),
        distance_meters,
        threshold_meters: state_guard.gate.threshold_meters(),
        notice: decision.notice(),
    }))
}

/// List the preset search radii.
#[utoipa::path(
    get,
    path = "/api/search/radii",
    tag = "bins",
    operation_id = "getSearchRadii",
    summary = "Get the search radius menu",
    description = "Returns the preset radii and the progressive search policy.",
    responses(
        (status = 200, description = "Radius menu", body = RadiiResponse)
    )
)]
pub async fn get_radii(State(state): State<SharedState>) -> Json<RadiiResponse> {
    let state_guard = state.read().await;

    Json(RadiiResponse {
        preset_radii_meters: state_guard.config.search.preset_radii.clone(),
        expansion: state_guard.config.search.expansion,
    })
}
