//! Rewards catalog.
//!
//! Read-only list of items a user can work towards, shipped with the crate.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{BinscanError, Result};

const BUNDLED_REWARDS: &str = include_str!("../data/rewards.json");

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "2",
    "title": "Reusable Shopping Bag",
    "points": 500
}))]
pub struct Reward {
    /// Catalog id.
    #[schema(example = "2")]
    pub id: String,

    /// Display title.
    #[schema(example = "Reusable Shopping Bag")]
    pub title: String,

    /// Cost in points.
    #[schema(example = 500)]
    pub points: u32,
}

/// The rewards catalog, in display order.
#[derive(Debug, Clone, Default)]
pub struct RewardCatalog {
    rewards: Vec<Reward>,
}

impl RewardCatalog {
    /// The catalog that ships with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::BundledDataInvalid`] if the packaged data is malformed.
    pub fn bundled() -> Result<Self> {
        let rewards: Vec<Reward> =
            serde_json::from_str(BUNDLED_REWARDS).map_err(|e| BinscanError::BundledDataInvalid {
                source_name: "bundled rewards".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { rewards })
    }

    /// Every reward.
    #[must_use]
    pub fn all(&self) -> &[Reward] {
        &self.rewards
    }

    /// Look up one reward.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Reward> {
        self.rewards.iter().find(|r| r.id == id)
    }

    /// Rewards costing at most `balance` points, in catalog order.
    pub fn affordable(&self, balance: u32) -> impl Iterator<Item = &Reward> {
        self.rewards.iter().filter(move |r| r.points <= balance)
    }
}
