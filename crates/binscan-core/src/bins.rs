//! Trash bin records and the append-only bin registry.
//!
//! The registry starts from the packaged bin list (or a configured override
//! file) and grows as pins are dropped on the map. The only removal is
//! [`BinRegistry::undo_drop`], which takes back a pin whose save failed.
//! Insertion order is preserved because search results are reported in
//! registry order.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{BinscanError, Result};
use crate::geo::Coordinate;

const BUNDLED_BINS: &str = include_str!("../data/bins.json");

/// Identifier of a bin: the packaged list uses integers, hand-made lists may
/// use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BinId {
    /// Numeric id, as in the packaged marker list.
    Number(u64),
    /// Free-form id.
    Text(String),
}

impl fmt::Display for BinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for BinId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for BinId {
    fn from(s: &str) -> Self {
        s.parse().map_or_else(|_| Self::Text(s.to_string()), Self::Number)
    }
}

/// A physical waste-disposal point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 2,
    "name": "Trash Bin 2",
    "latitude": 13.7380,
    "longitude": 100.5235
}))]
pub struct Bin {
    /// Unique bin id.
    pub id: BinId,

    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Trash Bin 2")]
    pub name: Option<String>,

    /// Where the bin stands.
    #[serde(flatten)]
    pub position: Coordinate,
}

impl Bin {
    /// Create an unnamed bin.
    #[must_use]
    pub fn new(id: impl Into<BinId>, position: Coordinate) -> Self {
        Self {
            id: id.into(),
            name: None,
            position,
        }
    }
}

/// Ordered, append-only collection of bins with unique ids.
#[derive(Debug, Clone, Default)]
pub struct BinRegistry {
    bins: Vec<Bin>,
    ids: HashSet<String>,
    base_len: usize,
}

impl BinRegistry {
    /// Build a registry from an initial list.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::DuplicateBinId`] if two bins share an id, or
    /// [`BinscanError::BundledDataInvalid`] if a text id is empty.
    pub fn new(bins: Vec<Bin>) -> Result<Self> {
        let mut registry = Self::default();
        for bin in bins {
            registry.insert(bin)?;
        }
        registry.base_len = registry.bins.len();
        Ok(registry)
    }

    /// Load the bin list that ships with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the packaged data is malformed.
    pub fn bundled() -> Result<Self> {
        Self::from_json("bundled bins", BUNDLED_BINS)
    }

    /// Parse a JSON array of `{id, latitude, longitude}` records.
    ///
    /// Any malformed entry rejects the whole list.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::BundledDataInvalid`] naming `source_name`.
    pub fn from_json(source_name: &str, json: &str) -> Result<Self> {
        let invalid = |message: String| BinscanError::BundledDataInvalid {
            source_name: source_name.to_string(),
            message,
        };

        let bins: Vec<Bin> = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
        Self::new(bins).map_err(|e| match e {
            BinscanError::BundledDataInvalid { message, .. } => invalid(message),
            other => invalid(other.to_string()),
        })
    }

    /// Load a bin list from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&path.display().to_string(), &content)?;
        tracing::info!(path = %path.display(), count = registry.len(), "Loaded bin list");
        Ok(registry)
    }

    /// All bins in insertion order.
    #[must_use]
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Bins appended after the initial list was loaded.
    #[must_use]
    pub fn dropped(&self) -> &[Bin] {
        &self.bins[self.base_len..]
    }

    /// Number of registered bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether the registry has no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Look a bin up by the textual form of its id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Bin> {
        self.bins.iter().find(|bin| bin.id.to_string() == id)
    }

    /// Look a bin up, failing with [`BinscanError::BinNotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if no bin has this id.
    pub fn require(&self, id: &str) -> Result<&Bin> {
        self.get(id)
            .ok_or_else(|| BinscanError::BinNotFound(id.to_string()))
    }

    /// Append a bin at a user-chosen location and return it.
    ///
    /// The new id is one more than the largest numeric id present. If that
    /// would overflow, the smallest free numeric id is used instead.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::BinIdsExhausted`] if no numeric id is free.
    pub fn drop_pin(&mut self, position: Coordinate) -> Result<&Bin> {
        let next = self.next_free_id().ok_or(BinscanError::BinIdsExhausted)?;

        let bin = Bin::new(next, position);
        self.ids.insert(bin.id.to_string());
        self.bins.push(bin);
        tracing::info!(
            id = next,
            latitude = position.latitude(),
            longitude = position.longitude(),
            "Dropped new bin pin"
        );
        Ok(&self.bins[self.bins.len() - 1])
    }

    /// Take back the most recent dropped pin.
    ///
    /// Bins from the initial list are never removed.
    pub fn undo_drop(&mut self) -> Option<Bin> {
        if self.bins.len() <= self.base_len {
            return None;
        }
        let bin = self.bins.pop()?;
        self.ids.remove(&bin.id.to_string());
        tracing::info!(id = %bin.id, "Removed dropped bin pin");
        Some(bin)
    }

    fn next_free_id(&self) -> Option<u64> {
        let after_max = self
            .bins
            .iter()
            .filter_map(|bin| match bin.id {
                BinId::Number(n) => Some(n),
                BinId::Text(_) => None,
            })
            .max()
            .map_or(Some(1), |n| n.checked_add(1));

        // A text id such as "5" still occupies that key. The registry is
        // finite, so each range yields a free id within len() + 1 steps
        // unless it runs out first.
        after_max
            .into_iter()
            .flat_map(|start| start..=u64::MAX)
            .chain(1..=u64::MAX)
            .find(|n| !self.ids.contains(&n.to_string()))
    }

    /// Re-append pins that were dropped in an earlier session.
    ///
    /// Pins whose id is already taken are skipped, so restoring twice is harmless.
    pub fn restore_dropped(&mut self, pins: Vec<Bin>) -> usize {
        let mut restored = 0;
        for pin in pins {
            match self.insert(pin) {
                Ok(()) => restored += 1,
                Err(e) => tracing::warn!(error = %e, "Skipping stored pin"),
            }
        }
        restored
    }

    fn insert(&mut self, bin: Bin) -> Result<()> {
        if matches!(&bin.id, BinId::Text(s) if s.is_empty()) {
            return Err(BinscanError::BundledDataInvalid {
                source_name: "bin list".to_string(),
                message: "bin id must not be empty".to_string(),
            });
        }
        let key = bin.id.to_string();
        if !self.ids.insert(key.clone()) {
            return Err(BinscanError::DuplicateBinId(key));
        }
        self.bins.push(bin);
        Ok(())
    }
}
