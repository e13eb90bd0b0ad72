//! Rewards catalog API endpoint.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use binscan_core::Reward;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::state::SharedState;

/// Creates the rewards router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(list_rewards))
}

/// Optional filter for the catalog.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RewardsQuery {
    /// Only return rewards costing at most this many points.
    #[param(example = 600)]
    pub balance: Option<u32>,
}

/// The rewards catalog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardsResponse {
    /// Rewards in catalog order.
    pub rewards: Vec<Reward>,
}

/// List rewards.
#[utoipa::path(
    get,
    path = "/api/rewards",
    tag = "rewards",
    operation_id = "listRewards",
    summary = "List rewards",
    description = "Returns the rewards catalog. With `balance`, only rewards \
        the balance can cover are returned, still in catalog order.",
    params(RewardsQuery),
    responses(
        (status = 200, description = "Rewards", body = RewardsResponse)
    )
)]
pub async fn list_rewards(
    State(state): State<SharedState>,
    Query(query): Query<RewardsQuery>,
) -> Json<RewardsResponse> {
    let state_guard = state.read().await;
    let rewards = match query.balance {
        Some(balance) => state_guard.rewards.affordable(balance).cloned().collect(),
        None => state_guard.rewards.all().to_vec(),
    };

    Json(RewardsResponse { rewards })
}
