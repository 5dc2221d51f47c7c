//! Round 1 to round 2 promotion.
//!
//! The pool is every arrived team still in round 1. Selected teams move on,
//! all others in the pool are eliminated. Ids outside the pool are ignored.

use std::time::SystemTime;

use indexmap::IndexSet;
use thiserror::Error;

use crate::{
    dao::models::{PreviousStatus, Round, TeamEntity, TeamStatus},
    state::status::record,
};

pub const PROMOTED_REASON: &str = "Promoted to Round 2";
pub const NOT_PROMOTED_REASON: &str = "Not promoted to Round 2";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionError {
    #[error("team_ids must be a non-empty array")]
    NoSelection,
    #[error("no teams available for promotion")]
    EmptyPool,
}

/// Whether `team` belongs to the promotion pool.
pub fn is_eligible(team: &TeamEntity) -> bool {
    team.status == TeamStatus::Arrived && team.current_round == Round::One
}

/// Updated teams produced by [`partition`], ready to be persisted.
#[derive(Debug, Default)]
pub struct PromotionOutcome {
    pub promoted: Vec<TeamEntity>,
    pub eliminated: Vec<TeamEntity>,
    /// Selected ids that were not part of the pool, in request order.
    pub ignored_ids: Vec<String>,
}

/// Split `pool` into promoted and eliminated teams.
///
/// Teams in `pool` that are not eligible are dropped, so callers may pass a
/// slightly stale scan.
pub fn partition(
    pool: Vec<TeamEntity>,
    selected: &[String],
    actor: &str,
    now: SystemTime,
) -> Result<PromotionOutcome, PromotionError> {
    let selected: IndexSet<&str> = selected
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    if selected.is_empty() {
        return Err(PromotionError::NoSelection);
    }

    let pool: Vec<TeamEntity> = pool.into_iter().filter(is_eligible).collect();
    if pool.is_empty() {
        return Err(PromotionError::EmptyPool);
    }

    let mut outcome = PromotionOutcome {
        ignored_ids: selected
            .iter()
            .filter(|id| !pool.iter().any(|team| team.id == **id))
            .map(|id| (*id).to_owned())
            .collect(),
        ..Default::default()
    };

    for mut team in pool {
        if selected.contains(team.id.as_str()) {
            team.promoted_to_round_2 = true;
            team.current_round = Round::Two;
            record(
                &mut team,
                PreviousStatus::Arrived,
                PROMOTED_REASON.to_owned(),
                actor,
                now,
            );
            outcome.promoted.push(team);
        } else {
            team.status = TeamStatus::Eliminated;
            team.eliminated_round = Some(Round::One);
            record(
                &mut team,
                PreviousStatus::Arrived,
                NOT_PROMOTED_REASON.to_owned(),
                actor,
                now,
            );
            outcome.eliminated.push(team);
        }
    }

    Ok(outcome)
}
