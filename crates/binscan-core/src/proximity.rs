//! Radius search over the bin list.
//!
//! Every search is a linear scan: each bin's haversine distance from the
//! origin is computed independently and the bin is kept when
//! `distance <= radius`. Results keep the input order; nothing here sorts by
//! distance.
//!
//! Two entry points exist for callers that may not have a location fix
//! ([`search`] and [`search_expanding`]). They fail with
//! [`BinscanError::LocationUnavailable`] instead of reporting an empty result,
//! so "could not search" and "nothing in range" stay distinguishable.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bins::Bin;
use crate::error::{BinscanError, Result};
use crate::geo::Coordinate;

/// Radii offered in the search menu, in meters.
pub const PRESET_RADII_METERS: [f64; 3] = [100.0, 250.0, 500.0];

/// Upper bound on the number of passes a single expansion may make.
pub const MAX_EXPANSION_STEPS: u32 = 10_000;

/// A matched bin together with its distance from the search origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 2,
    "latitude": 13.7380,
    "longitude": 100.5235,
    "distance_meters": 150.87
}))]
pub struct NearbyBin {
    /// The bin.
    #[serde(flatten)]
    pub bin: Bin,

    /// Great-circle distance from the origin in meters.
    #[schema(example = 150.87)]
    pub distance_meters: f64,
}

/// Keep the bins within `radius_meters` of `origin`, in their original order.
#[must_use]
pub fn find_within(origin: &Coordinate, bins: &[Bin], radius_meters: f64) -> Vec<Bin> {
    bins.iter()
        .filter(|bin| origin.distance_to(&bin.position) <= radius_meters)
        .cloned()
        .collect()
}

/// Like [`find_within`], also reporting each match's distance.
#[must_use]
pub fn find_within_with_distances(
    origin: &Coordinate,
    bins: &[Bin],
    radius_meters: f64,
) -> Vec<NearbyBin> {
    bins.iter()
        .filter_map(|bin| {
            let distance_meters = origin.distance_to(&bin.position);
            (distance_meters <= radius_meters).then(|| NearbyBin {
                bin: bin.clone(),
                distance_meters,
            })
        })
        .collect()
}

/// Result of a single-radius search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// At least one bin is in range.
    Found {
        /// Radius that was searched.
        radius_meters: f64,
        /// Matches in bin-list order.
        bins: Vec<NearbyBin>,
    },
    /// The search ran and nothing was in range.
    NoneInRange {
        /// Radius that was searched.
        radius_meters: f64,
    },
}

impl SearchOutcome {
    /// Matched bins, empty when nothing was in range.
    #[must_use]
    pub fn bins(&self) -> &[NearbyBin] {
        match self {
            Self::Found { bins, .. } => bins,
            Self::NoneInRange { .. } => &[],
        }
    }

    /// Whether any bin was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Run a radius search for a caller whose location may not be known yet.
///
/// # Errors
///
/// - [`BinscanError::LocationUnavailable`] when `origin` is `None`
/// - [`BinscanError::InvalidRadius`] when the radius is not a positive finite number
pub fn search(origin: Option<Coordinate>, bins: &[Bin], radius_meters: f64) -> Result<SearchOutcome> {
    let origin = origin.ok_or(BinscanError::LocationUnavailable)?;
    validate_radius(radius_meters)?;

    let matches = find_within_with_distances(&origin, bins, radius_meters);
    tracing::debug!(
        radius_meters,
        candidates = bins.len(),
        matches = matches.len(),
        "Radius search"
    );

    Ok(if matches.is_empty() {
        SearchOutcome::NoneInRange { radius_meters }
    } else {
        SearchOutcome::Found {
            radius_meters,
            bins: matches,
        }
    })
}

/// Check that a radius is usable for a search.
///
/// # Errors
///
/// Returns [`BinscanError::InvalidRadius`] for zero, negative, or non-finite values.
pub fn validate_radius(radius_meters: f64) -> Result<()> {
    if radius_meters.is_finite() && radius_meters > 0.0 {
        Ok(())
    } else {
        Err(BinscanError::InvalidRadius(radius_meters))
    }
}

/// Progressive radius policy: search at `initial`, then widen by `step` until
/// something is found or the radius would exceed `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RadiusExpansion {
    /// First radius tried, in meters.
    #[schema(example = 100.0)]
    pub initial: f64,

    /// Amount added after each empty pass, in meters.
    #[schema(example = 100.0)]
    pub step: f64,

    /// Largest radius tried, in meters.
    #[schema(example = 1000.0)]
    pub max: f64,
}

impl Default for RadiusExpansion {
    fn default() -> Self {
        Self {
            initial: 100.0,
            step: 100.0,
            max: 1000.0,
        }
    }
}

impl RadiusExpansion {
    /// Check the policy is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::InvalidExpansion`] if any value is non-finite,
    /// `initial` or `step` is not positive, `max < initial`, or the policy
    /// would take more than [`MAX_EXPANSION_STEPS`] passes.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(BinscanError::InvalidExpansion(msg.to_string()));

        if !(self.initial.is_finite() && self.step.is_finite() && self.max.is_finite()) {
            return fail("initial, step and max must be finite");
        }
        if self.initial <= 0.0 {
            return fail("initial radius must be positive");
        }
        if self.step <= 0.0 {
            return fail("step must be positive");
        }
        if self.max < self.initial {
            return fail("max radius must be at least the initial radius");
        }
        if (self.max - self.initial) / self.step >= f64::from(MAX_EXPANSION_STEPS) {
            return fail("step is too small for the radius range");
        }
        Ok(())
    }

    /// Radii visited by this policy, in order.
    pub fn radii(&self) -> impl Iterator<Item = f64> + '_ {
        (0..MAX_EXPANSION_STEPS)
            .map(move |k| self.initial + self.step * f64::from(k))
            .take_while(move |radius| *radius <= self.max)
    }
}

/// Result of a progressive search.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionOutcome {
    /// Bins were found at `radius_meters`.
    Found {
        /// The first radius with a non-empty result.
        radius_meters: f64,
        /// Matches at that radius, in bin-list order.
        bins: Vec<NearbyBin>,
        /// Passes made, including the successful one.
        attempts: u32,
    },
    /// Every radius up to the maximum came back empty.
    Exhausted {
        /// Largest radius the policy allows.
        max_radius_meters: f64,
        /// Passes made.
        attempts: u32,
    },
}

/// Widen the search radius until a bin is found or the policy runs out.
///
/// Each pass re-scans every bin.
///
/// # Errors
///
/// Returns [`BinscanError::InvalidExpansion`] if the policy is malformed.
pub fn expand(
    origin: &Coordinate,
    bins: &[Bin],
    policy: &RadiusExpansion,
) -> Result<ExpansionOutcome> {
    policy.validate()?;

    let mut attempts = 0;
    for radius_meters in policy.radii() {
        attempts += 1;
        let matches = find_within_with_distances(origin, bins, radius_meters);
        if !matches.is_empty() {
            tracing::debug!(radius_meters, attempts, matches = matches.len(), "Expansion found bins");
            return Ok(ExpansionOutcome::Found {
                radius_meters,
                bins: matches,
                attempts,
            });
        }
    }

    tracing::debug!(max = policy.max, attempts, "Expansion exhausted");
    Ok(ExpansionOutcome::Exhausted {
        max_radius_meters: policy.max,
        attempts,
    })
}

/// [`expand`] for a caller whose location may not be known yet.
///
/// # Errors
///
/// Returns [`BinscanError::LocationUnavailable`] when `origin` is `None`, or
/// [`BinscanError::InvalidExpansion`] if the policy is malformed.
pub fn search_expanding(
    origin: Option<Coordinate>,
    bins: &[Bin],
    policy: &RadiusExpansion,
) -> Result<ExpansionOutcome> {
    let origin = origin.ok_or(BinscanError::LocationUnavailable)?;
    expand(&origin, bins, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bins::{BinId, BinRegistry};

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn origin() -> Coordinate {
        coord(13.7367, 100.5231)
    }

    fn sample_bins() -> Vec<Bin> {
        vec![
            Bin::new(1, coord(13.7400, 100.5240)), // ~380 m
            Bin::new(2, coord(13.7380, 100.5235)), // ~151 m
            Bin::new(3, coord(13.7370, 100.5231)), // ~33 m
            Bin::new(4, coord(13.8000, 100.6000)), // ~11 km
        ]
    }

    fn ids(bins: &[Bin]) -> Vec<BinId> {
        bins.iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn test_scenario_bin_at_151_meters() {
        let bins = vec![Bin::new(2, coord(13.7380, 100.5235))];
        assert!(find_within(&origin(), &bins, 100.0).is_empty());
        assert!(find_within(&origin(), &bins, 150.0).is_empty());
        assert_eq!(find_within(&origin(), &bins, 151.0).len(), 1);
        assert_eq!(find_within(&origin(), &bins, 200.0).len(), 1);
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        for r in [0.0, 1.0, 1e9] {
            assert!(find_within(&origin(), &[], r).is_empty());
        }
    }

    #[test]
    fn test_result_preserves_input_order() {
        let bins = sample_bins();
        let found = find_within(&origin(), &bins, 500.0);
        // Input order, not distance order.
        assert_eq!(ids(&found), vec![BinId::Number(1), BinId::Number(2), BinId::Number(3)]);
    }

    #[test]
    fn test_result_is_subsequence_for_any_radius() {
        let bins = sample_bins();
        for r in [0.0, 10.0, 40.0, 160.0, 400.0, 20_000.0] {
            let found = find_within(&origin(), &bins, r);
            let mut rest = bins.iter();
            for bin in &found {
                assert!(rest.any(|b| b == bin), "not a subsequence at r={r}");
            }
        }
    }

    #[test]
    fn test_monotonic_in_radius() {
        let bins = sample_bins();
        let radii = [0.0, 30.0, 34.0, 151.0, 380.0, 400.0, 12_000.0];
        for pair in radii.windows(2) {
            let small = find_within(&origin(), &bins, pair[0]);
            let large = find_within(&origin(), &bins, pair[1]);
            assert!(small.iter().all(|b| large.contains(b)));
        }
    }

    #[test]
    fn test_zero_radius_keeps_colocated_bin() {
        let bins = vec![Bin::new(1, origin()), Bin::new(2, coord(13.7370, 100.5231))];
        assert_eq!(ids(&find_within(&origin(), &bins, 0.0)), vec![BinId::Number(1)]);
    }

    #[test]
    fn test_distances_reported() {
        let found = find_within_with_distances(&origin(), &sample_bins(), 200.0);
        assert_eq!(found.len(), 2);
        assert!((found[0].distance_meters - 150.87).abs() < 0.05);
        assert!(found[1].distance_meters < 40.0);
    }

    #[test]
    fn test_search_without_origin_is_not_ready() {
        let err = search(None, &sample_bins(), 100.0).unwrap_err();
        assert!(matches!(err, BinscanError::LocationUnavailable));

        // Even with no bins at all, a missing origin is not an empty result.
        let err = search(None, &[], 100.0).unwrap_err();
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_search_rejects_bad_radius() {
        for r in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = search(Some(origin()), &sample_bins(), r).unwrap_err();
            assert!(matches!(err, BinscanError::InvalidRadius(_)));
        }
    }

    #[test]
    fn test_search_outcomes() {
        let outcome = search(Some(origin()), &sample_bins(), 20.0).unwrap();
        assert_eq!(outcome, SearchOutcome::NoneInRange { radius_meters: 20.0 });
        assert!(outcome.bins().is_empty());

        let outcome = search(Some(origin()), &sample_bins(), 100.0).unwrap();
        assert!(outcome.is_found());
        assert_eq!(outcome.bins().len(), 1);
    }

    #[test]
    fn test_expansion_finds_at_second_step() {
        let bins = vec![Bin::new(2, coord(13.7380, 100.5235))];
        let outcome = expand(&origin(), &bins, &RadiusExpansion::default()).unwrap();
        match outcome {
            ExpansionOutcome::Found {
                radius_meters,
                bins,
                attempts,
            } => {
                assert_eq!(radius_meters, 200.0);
                assert_eq!(attempts, 2);
                assert_eq!(bins.len(), 1);
            }
            ExpansionOutcome::Exhausted { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn test_expansion_returns_all_matches_at_first_hit() {
        let outcome = expand(&origin(), &sample_bins(), &RadiusExpansion::default()).unwrap();
        let ExpansionOutcome::Found { radius_meters, bins, .. } = outcome else {
            panic!("expected a match");
        };
        assert_eq!(radius_meters, 100.0);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].bin.id, BinId::Number(3));
    }

    #[test]
    fn test_expansion_exhausts() {
        let far = vec![Bin::new(4, coord(13.8000, 100.6000))];
        let outcome = expand(&origin(), &far, &RadiusExpansion::default()).unwrap();
        assert_eq!(
            outcome,
            ExpansionOutcome::Exhausted {
                max_radius_meters: 1000.0,
                attempts: 10,
            }
        );
    }

    #[test]
    fn test_expansion_includes_max_when_reachable() {
        let policy = RadiusExpansion {
            initial: 250.0,
            step: 250.0,
            max: 1000.0,
        };
        let radii: Vec<f64> = policy.radii().collect();
        assert_eq!(radii, vec![250.0, 500.0, 750.0, 1000.0]);

        let uneven = RadiusExpansion {
            initial: 100.0,
            step: 300.0,
            max: 800.0,
        };
        assert_eq!(uneven.radii().collect::<Vec<_>>(), vec![100.0, 400.0, 700.0]);
    }

    #[test]
    fn test_expansion_policy_validation() {
        let bad = [
            RadiusExpansion { initial: 0.0, ..Default::default() },
            RadiusExpansion { step: 0.0, ..Default::default() },
            RadiusExpansion { step: -1.0, ..Default::default() },
            RadiusExpansion { max: 50.0, ..Default::default() },
            RadiusExpansion { max: f64::NAN, ..Default::default() },
            RadiusExpansion { step: 0.001, ..Default::default() },
        ];
        for policy in bad {
            assert!(policy.validate().is_err(), "{policy:?} should be rejected");
        }
        assert!(RadiusExpansion::default().validate().is_ok());
    }

    #[test]
    fn test_search_expanding_requires_origin() {
        let err = search_expanding(None, &sample_bins(), &RadiusExpansion::default()).unwrap_err();
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_bundled_registry_scenario() {
        let registry = BinRegistry::bundled().unwrap();
        // Bin 1 sits exactly at the origin.
        let found = find_within(&origin(), registry.bins(), 200.0);
        assert_eq!(ids(&found), vec![BinId::Number(1), BinId::Number(2)]);
    }
}
