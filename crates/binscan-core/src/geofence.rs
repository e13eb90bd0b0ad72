//! Proximity gate checked before the scan screen opens from a map marker.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bins::Bin;
use crate::error::{BinscanError, Result};
use crate::geo::Coordinate;

/// Default distance within which a bin may be scanned, in meters.
pub const DEFAULT_GEOFENCE_THRESHOLD_METERS: f64 = 100.0;

/// `true` when `bin_position` lies within `threshold_meters` of `origin`.
///
/// Same predicate as a single-bin [`find_within`](crate::proximity::find_within).
#[must_use]
pub fn is_within_geofence(origin: &Coordinate, bin_position: &Coordinate, threshold_meters: f64) -> bool {
    origin.distance_to(bin_position) <= threshold_meters
}

/// Outcome of a geofence check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GeofenceDecision {
    /// Close enough; the caller may proceed to scanning.
    Granted {
        /// Distance to the bin in meters.
        distance_meters: f64,
    },
    /// Too far away; the caller shows [`GeofenceDecision::notice`] and stays put.
    TooFar {
        /// Distance to the bin in meters.
        distance_meters: f64,
        /// Threshold that was enforced.
        threshold_meters: f64,
    },
}

impl GeofenceDecision {
    /// Whether access is granted.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// User-facing notice for a refusal, built from the enforced threshold.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Granted { .. } => None,
            Self::TooFar {
                distance_meters,
                threshold_meters,
            } => Some(format!(
                "You are too far from this bin ({distance_meters:.0} m away). \
                 Move within {threshold_meters:.0} meters to scan it."
            )),
        }
    }
}

/// Geofence check with a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceGate {
    threshold_meters: f64,
}

impl Default for GeofenceGate {
    fn default() -> Self {
        Self {
            threshold_meters: DEFAULT_GEOFENCE_THRESHOLD_METERS,
        }
    }
}

impl GeofenceGate {
    /// Create a gate.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::InvalidRadius`] if the threshold is not a
    /// positive finite number.
    pub fn new(threshold_meters: f64) -> Result<Self> {
        crate::proximity::validate_radius(threshold_meters)?;
        Ok(Self { threshold_meters })
    }

    /// Enforced threshold in meters.
    #[must_use]
    pub const fn threshold_meters(&self) -> f64 {
        self.threshold_meters
    }

    /// Decide whether a user at `origin` may scan `bin`.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::LocationUnavailable`] when `origin` is `None`.
    pub fn check(&self, origin: Option<Coordinate>, bin: &Bin) -> Result<GeofenceDecision> {
        let origin = origin.ok_or(BinscanError::LocationUnavailable)?;
        let distance_meters = origin.distance_to(&bin.position);

        let decision = if is_within_geofence(&origin, &bin.position, self.threshold_meters) {
            GeofenceDecision::Granted { distance_meters }
        } else {
            GeofenceDecision::TooFar {
                distance_meters,
                threshold_meters: self.threshold_meters,
            }
        };
        tracing::debug!(bin = %bin.id, distance_meters, granted = decision.is_granted(), "Geofence check");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proximity::find_within;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_matches_single_bin_search() {
        let origin = coord(13.7367, 100.5231);
        let positions = [
            coord(13.7367, 100.5231),
            coord(13.7370, 100.5231),
            coord(13.7375, 100.5231),
            coord(13.7380, 100.5235),
            coord(13.7400, 100.5240),
        ];
        for threshold in [10.0, 50.0, 100.0, 151.0] {
            for pos in positions {
                let bin = Bin::new(1, pos);
                assert_eq!(
                    is_within_geofence(&origin, &pos, threshold),
                    !find_within(&origin, &[bin], threshold).is_empty()
                );
            }
        }
    }

    #[test]
    fn test_gate_grants_and_refuses() {
        let gate = GeofenceGate::default();
        let origin = Some(coord(13.7367, 100.5231));

        let near = Bin::new(3, coord(13.7370, 100.5231));
        let decision = gate.check(origin, &near).unwrap();
        assert!(decision.is_granted());
        assert!(decision.notice().is_none());

        let far = Bin::new(2, coord(13.7380, 100.5235));
        let decision = gate.check(origin, &far).unwrap();
        assert!(!decision.is_granted());
        let notice = decision.notice().unwrap();
        assert!(notice.contains("100 meters"), "{notice}");
        assert!(notice.contains("151 m away"), "{notice}");
    }

    #[test]
    fn test_gate_requires_location() {
        let bin = Bin::new(1, coord(0.0, 0.0));
        let err = GeofenceGate::default().check(None, &bin).unwrap_err();
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_gate_rejects_bad_threshold() {
        assert!(GeofenceGate::new(0.0).is_err());
        assert!(GeofenceGate::new(-10.0).is_err());
        assert_eq!(GeofenceGate::new(25.0).unwrap().threshold_meters(), 25.0);
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_value(GeofenceDecision::TooFar {
            distance_meters: 150.0,
            threshold_meters: 100.0,
        })
        .unwrap();
        assert_eq!(json["decision"], "too_far");
        assert_eq!(json["threshold_meters"], 100.0);
    }
}
