//! Geographic coordinates and great-circle distance.
//!
//! Distances use the haversine formula on a spherical Earth of radius
//! [`EARTH_RADIUS_METERS`]. All angles are accepted in degrees and converted
//! to radians internally; results are meters in `f64` precision.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{BinscanError, Result};

/// Mean Earth radius used for every distance computation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A validated latitude/longitude pair in degrees.
///
/// Construction goes through [`Coordinate::new`], and deserialization goes
/// through the same checks, so a `Coordinate` in hand is always finite and
/// within range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawCoordinate")]
#[schema(example = json!({"latitude": 13.7367, "longitude": 100.5231}))]
pub struct Coordinate {
    /// Latitude in degrees, `-90..=90`.
    #[schema(example = 13.7367, minimum = -90, maximum = 90)]
    latitude: f64,

    /// Longitude in degrees, `-180..=180`.
    #[schema(example = 100.5231, minimum = -180, maximum = 180)]
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = BinscanError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::InvalidCoordinate`] if either value is NaN,
    /// infinite, or outside its valid range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let invalid = |reason| BinscanError::InvalidCoordinate {
            latitude,
            longitude,
            reason,
        };

        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(invalid("values must be finite numbers"));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(invalid("latitude must be between -90 and 90 degrees"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(invalid("longitude must be between -180 and 180 degrees"));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build a coordinate from an optional pair, as supplied by a client that
    /// may not have a location fix yet.
    ///
    /// Returns `Ok(None)` when either half is missing.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::InvalidCoordinate`] if both halves are present
    /// but invalid.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<Self>> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            _ => Ok(None),
        }
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        haversine_distance(self, other)
    }
}

/// Great-circle distance between two coordinates in meters.
///
/// `a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)`, `d = 2R · atan2(√a, √(1−a))`.
#[must_use]
pub fn haversine_distance(from: &Coordinate, to: &Coordinate) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let half_chord = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let angle = 2.0 * half_chord.sqrt().atan2((1.0 - half_chord).sqrt());

    EARTH_RADIUS_METERS * angle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        for p in [
            coord(13.7367, 100.5231),
            coord(0.0, 0.0),
            coord(-89.9, 179.9),
            coord(51.5, -0.12),
        ] {
            assert_eq!(haversine_distance(&p, &p), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (coord(13.7367, 100.5231), coord(13.7400, 100.5240)),
            (coord(40.7128, -74.0060), coord(34.0522, -118.2437)),
            (coord(-33.86, 151.21), coord(35.68, 139.69)),
        ];
        for (a, b) in pairs {
            assert_eq!(a.distance_to(&b), b.distance_to(&a));
        }
    }

    #[test]
    fn test_known_distance_near_bangkok() {
        let origin = coord(13.7367, 100.5231);
        let bin = coord(13.7380, 100.5235);
        let d = origin.distance_to(&bin);
        assert!((d - 150.87).abs() < 0.05, "got {d}");
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = coord(0.0, 0.0).distance_to(&coord(1.0, 0.0));
        let expected = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_antipodal_distance() {
        let d = coord(0.0, 0.0).distance_to(&coord(0.0, 180.0));
        let expected = EARTH_RADIUS_METERS * std::f64::consts::PI;
        assert!((d - expected).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(-90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, 180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(Coordinate::from_parts(None, Some(1.0)).unwrap(), None);
        assert_eq!(Coordinate::from_parts(Some(1.0), None).unwrap(), None);
        assert_eq!(
            Coordinate::from_parts(Some(1.0), Some(2.0)).unwrap(),
            Some(coord(1.0, 2.0))
        );
        assert!(Coordinate::from_parts(Some(100.0), Some(2.0)).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 13.7, "longitude": 100.5}"#).unwrap();
        assert_eq!(ok.latitude(), 13.7);

        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude": 213.7, "longitude": 100.5}"#);
        assert!(bad.is_err());

        let missing = serde_json::from_str::<Coordinate>(r#"{"latitude": 13.7}"#);
        assert!(missing.is_err());
    }
}
