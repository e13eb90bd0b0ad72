//! Scan submission and history API endpoints.
//!
//! The client decodes the QR code and posts the result here together with
//! its current position. An unrecognized code and a scan during the cooldown
//! are ordinary outcomes (200), not errors. Only a missing position fails
//! (424), because no record can be geotagged without one.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use binscan_core::{Coordinate, ScanOutcome, ScanRecord, ScanRequest};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the scans router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_history).post(submit_scan))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A decoded QR scan.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "code": "BIN-001",
    "latitude": 13.7370,
    "longitude": 100.5231,
    "device": "phone-a"
}))]
pub struct SubmitScanRequest {
    /// Decoded QR string. Compared exactly against the recognized codes.
    #[schema(example = "BIN-001")]
    pub code: String,

    /// Latitude at scan time. Omit when no position fix is available.
    #[schema(example = 13.7370)]
    pub latitude: Option<f64>,

    /// Longitude at scan time. Omit when no position fix is available.
    #[schema(example = 100.5231)]
    pub longitude: Option<f64>,

    /// Scanning device, used to key the cooldown.
    #[schema(example = "phone-a")]
    pub device: Option<String>,
}

/// What happened to a submitted scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Accepted and added to the history.
    Recorded,
    /// Code not recognized.
    Rejected,
    /// Device scanned too recently.
    CoolingDown,
}

/// Result of a scan submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "recorded",
    "record": {
        "id": "01936b2e-8f5a-7c3d-9e1f-2a3b4c5d6e7f",
        "position": {"latitude": 13.7370, "longitude": 100.5231},
        "timestamp": "2025-01-15 10:30:00",
        "recorded_at_utc": "2025-01-15T03:30:00Z",
        "code": "BIN-001"
    },
    "retry_after_ms": null,
    "message": "Scan recorded."
}))]
pub struct SubmitScanResponse {
    /// Outcome of the scan.
    pub status: ScanStatus,

    /// The new history entry when `status` is `recorded`.
    #[schema(nullable)]
    pub record: Option<ScanRecord>,

    /// Milliseconds until the device may scan again when `status` is
    /// `cooling_down`.
    #[schema(nullable)]
    pub retry_after_ms: Option<u64>,

    /// User-facing message.
    pub message: String,
}

impl From<ScanOutcome> for SubmitScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Recorded(record) => Self {
                status: ScanStatus::Recorded,
                record: Some(record),
                retry_after_ms: None,
                message: "Scan recorded.".to_string(),
            },
            ScanOutcome::Rejected { code } => Self {
                status: ScanStatus::Rejected,
                record: None,
                retry_after_ms: None,
                message: format!("Invalid QR code: '{code}' is not a registered bin."),
            },
            ScanOutcome::CoolingDown { retry_after } => Self {
                status: ScanStatus::CoolingDown,
                record: None,
                retry_after_ms: Some(u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX)),
                message: "Scanned too recently. Wait a moment and try again.".to_string(),
            },
        }
    }
}

/// Scan history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanHistoryResponse {
    /// Accepted scans, oldest first.
    pub entries: Vec<ScanRecord>,

    /// Number of entries.
    #[schema(example = 1)]
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a decoded QR scan.
#[utoipa::path(
    post,
    path = "/api/scans",
    tag = "scans",
    operation_id = "submitScan",
    summary = "Submit a scan",
    description = "Checks, in order: that a position was supplied, that the \
        device is not cooling down from its previous accepted scan, and that \
        the code is recognized. Only an accepted scan is timestamped and \
        appended to the history.",
    request_body = SubmitScanRequest,
    responses(
        (status = 200, description = "Scan processed", body = SubmitScanResponse),
        (status = 400, description = "Invalid coordinate", body = super::error::ErrorResponse),
        (status = 424, description = "No position fix yet", body = super::error::ErrorResponse),
        (status = 500, description = "Failed to write history", body = super::error::ErrorResponse)
    )
)]
pub async fn submit_scan(
    State(state): State<SharedState>,
    Json(request): Json<SubmitScanRequest>,
) -> ApiResult<Json<SubmitScanResponse>> {
    let position = Coordinate::from_parts(request.latitude, request.longitude)?;
    let scan = ScanRequest {
        code: request.code,
        position,
        device: request.device,
    };

    let mut state_guard = state.write().await;
    let state_ref = &mut *state_guard;
    let outcome = state_ref.scans.process(&state_ref.codes, scan, Utc::now())?;

    Ok(Json(outcome.into()))
}

/// Get the scan history.
#[utoipa::path(
    get,
    path = "/api/scans",
    tag = "scans",
    operation_id = "getScanHistory",
    summary = "List accepted scans",
    responses(
        (status = 200, description = "Scan history", body = ScanHistoryResponse),
        (status = 500, description = "Failed to read history", body = super::error::ErrorResponse)
    )
)]
pub async fn get_history(State(state): State<SharedState>) -> ApiResult<Json<ScanHistoryResponse>> {
    let state_guard = state.read().await;
    let entries = state_guard.scans.history().load()?;

    Ok(Json(ScanHistoryResponse {
        count: entries.len(),
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cooling_down_reports_millis() {
        let response = SubmitScanResponse::from(ScanOutcome::CoolingDown {
            retry_after: Duration::from_millis(1500),
        });
        assert_eq!(response.status, ScanStatus::CoolingDown);
        assert_eq!(response.retry_after_ms, Some(1500));
        assert!(response.record.is_none());
    }

    #[test]
    fn test_rejected_names_the_code() {
        let response = SubmitScanResponse::from(ScanOutcome::Rejected {
            code: "bin-001".into(),
        });
        assert_eq!(response.status, ScanStatus::Rejected);
        assert!(response.message.contains("bin-001"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ScanStatus::CoolingDown).unwrap();
        assert_eq!(json, "\"cooling_down\"");
    }
}
