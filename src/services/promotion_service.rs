//! Bulk round 1 to round 2 promotion.

use std::time::SystemTime;

use tracing::{debug, info};

use crate::{
    dao::competition_store::TeamQuery,
    dto::team::{PromoteRequest, PromotionResponse, TeamView},
    error::ServiceError,
    services::{
        sse_events,
        team_service::{resolve_actor, save_team},
    },
    state::{SharedState, promotion},
};

/// Promote the selected arrived round 1 teams and eliminate the rest of the pool.
///
/// Runs with the bulk gate held so no single-team command interleaves. Each
/// team is still written with its own version check.
pub async fn promote(
    state: &SharedState,
    request: PromoteRequest,
) -> Result<PromotionResponse, ServiceError> {
    let actor = resolve_actor(state, request.admin.as_deref());
    let store = state.require_store().await?;
    let _bulk = state.enter_bulk().await;

    let pool = store.find_teams(TeamQuery::promotion_pool()).await?;
    let outcome = promotion::partition(pool, &request.team_ids, &actor, SystemTime::now())?;
    if !outcome.ignored_ids.is_empty() {
        debug!(ignored = ?outcome.ignored_ids, "promotion ids outside the pool");
    }

    let mut promoted = Vec::with_capacity(outcome.promoted.len());
    for team in outcome.promoted {
        promoted.push(save_team(store.as_ref(), team).await?);
    }
    let mut eliminated = Vec::with_capacity(outcome.eliminated.len());
    for team in outcome.eliminated {
        eliminated.push(save_team(store.as_ref(), team).await?);
    }

    info!(
        promoted = promoted.len(),
        eliminated = eliminated.len(),
        actor = %actor,
        "promotion applied"
    );
    sse_events::broadcast_teams_promoted(
        state,
        promoted.iter().map(|team| team.id.clone()).collect(),
        eliminated.iter().map(|team| team.id.clone()).collect(),
    );

    let message = format!(
        "Promoted {} teams to Round 2, eliminated {} teams",
        promoted.len(),
        eliminated.len()
    );
    Ok(PromotionResponse {
        promoted_teams: promoted.into_iter().map(TeamView::from).collect(),
        eliminated_teams: eliminated.into_iter().map(TeamView::from).collect(),
        ignored_ids: outcome.ignored_ids,
        message,
    })
}
