//! # binscan-core
//!
//! Core logic for binscan: scanning QR codes on trash bins and finding bins
//! near the user.
//!
//! This crate provides:
//! - Haversine distance and radius search over the bin list
//! - Progressive (expanding radius) search
//! - The geofence gate checked before a bin may be scanned
//! - QR code validation against bundled and user-registered codes
//! - The scan pipeline that turns an accepted scan into a history entry
//! - Configuration and JSON file storage
//!
//! ## Architecture
//!
//! - [`geo`] - Coordinates and great-circle distance
//! - [`bins`] - Bin records and the append-only bin registry
//! - [`proximity`] - Fixed and progressive radius search
//! - [`geofence`] - Scan-screen proximity gate
//! - [`codes`] - QR code sets and validation
//! - [`scan`] - Cooldown and the scan-to-history pipeline
//! - [`history`] - Scan records and the append-only history log
//! - [`rewards`] - Rewards catalog
//! - [`config`] - Layered configuration loading and validation
//! - [`storage`] - JSON key-value storage
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared service types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]

pub mod bins;
pub mod codes;
pub mod config;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod history;
pub mod proximity;
pub mod rewards;
pub mod scan;
pub mod storage;
pub mod types;

// Re-export primary types for convenience
pub use bins::{Bin, BinId, BinRegistry};
pub use codes::{is_valid, validate_code_format, CodeSet, ValidCodeSet};
pub use config::{default_config_path, is_valid_timezone, Config, ConfigError, ConfigResult};
pub use error::{BinscanError, Error, Result};
pub use geo::{haversine_distance, Coordinate, EARTH_RADIUS_METERS};
pub use geofence::{
    is_within_geofence, GeofenceDecision, GeofenceGate, DEFAULT_GEOFENCE_THRESHOLD_METERS,
};
pub use history::{HistoryStore, ScanRecord, TimestampStyle, NO_CODE};
pub use proximity::{
    expand, find_within, find_within_with_distances, search, search_expanding, ExpansionOutcome,
    NearbyBin, RadiusExpansion, SearchOutcome, PRESET_RADII_METERS,
};
pub use rewards::{Reward, RewardCatalog};
pub use scan::{ScanCooldown, ScanOutcome, ScanPipeline, ScanRequest};
pub use storage::{default_data_dir, Storage};
pub use types::HealthResponse;
