//! QR code registry API endpoints.
//!
//! Lookups are exact: no trimming, no case folding. `bin-001` and `BIN-001`
//! are different codes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the codes router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_codes).post(register_code))
        .route("/{code}", get(check_code))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Every recognized code, by source.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "bundled": ["BIN-001", "BIN-002", "BIN-003"],
    "user": ["CAMPUS-7"]
}))]
pub struct CodesResponse {
    /// Codes shipped with the service. Read-only.
    pub bundled: Vec<String>,

    /// Codes registered through the API.
    pub user: Vec<String>,
}

/// Request body for registering a code.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({"code": "CAMPUS-7"}))]
pub struct RegisterCodeRequest {
    /// Code as printed on the bin. Must be non-empty, at most 256 bytes, and
    /// free of whitespace and control characters.
    #[schema(example = "CAMPUS-7", min_length = 1, max_length = 256)]
    pub code: String,
}

/// Result of a registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"code": "CAMPUS-7", "added": true}))]
pub struct RegisterCodeResponse {
    /// The code.
    pub code: String,

    /// `false` when the code was already recognized.
    pub added: bool,
}

/// Whether a code is recognized.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"code": "BIN-001", "valid": true}))]
pub struct CodeValidityResponse {
    /// The code as looked up.
    pub code: String,

    /// Whether a scan of this code would be accepted.
    pub valid: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// List recognized codes.
#[utoipa::path(
    get,
    path = "/api/codes",
    tag = "codes",
    operation_id = "listCodes",
    summary = "List recognized codes",
    description = "Returns the bundled codes and the user-registered codes. A \
        scan is accepted when its code appears in either list.",
    responses(
        (status = 200, description = "Code lists", body = CodesResponse)
    )
)]
pub async fn list_codes(State(state): State<SharedState>) -> Json<CodesResponse> {
    let state_guard = state.read().await;

    Json(CodesResponse {
        bundled: state_guard.codes.bundled().iter().map(str::to_string).collect(),
        user: state_guard.codes.user().iter().map(str::to_string).collect(),
    })
}

/// Register a new code.
#[utoipa::path(
    post,
    path = "/api/codes",
    tag = "codes",
    operation_id = "registerCode",
    summary = "Register a code",
    description = "Adds a code to the user set and saves it. Registering a \
        code that is already recognized succeeds with `added: false`.",
    request_body = RegisterCodeRequest,
    responses(
        (status = 201, description = "Code added", body = RegisterCodeResponse),
        (status = 200, description = "Code was already recognized", body = RegisterCodeResponse),
        (status = 400, description = "Malformed code", body = super::error::ErrorResponse),
        (status = 500, description = "Failed to save", body = super::error::ErrorResponse)
    )
)]
pub async fn register_code(
    State(state): State<SharedState>,
    Json(request): Json<RegisterCodeRequest>,
) -> ApiResult<(StatusCode, Json<RegisterCodeResponse>)> {
    let mut state_guard = state.write().await;
    let state_ref = &mut *state_guard;
    let added = state_ref
        .codes
        .register_and_save(&request.code, &state_ref.storage)?;

    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(RegisterCodeResponse {
            code: request.code,
            added,
        }),
    ))
}

/// Check a single code.
#[utoipa::path(
    get,
    path = "/api/codes/{code}",
    tag = "codes",
    operation_id = "checkCode",
    summary = "Check whether a code is recognized",
    params(
        ("code" = String, Path, description = "Code to look up, matched exactly")
    ),
    responses(
        (status = 200, description = "Lookup result", body = CodeValidityResponse)
    )
)]
pub async fn check_code(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Json<CodeValidityResponse> {
    let state_guard = state.read().await;
    let valid = state_guard.codes.is_valid(&code);

    Json(CodeValidityResponse { code, valid })
}
