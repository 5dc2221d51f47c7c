//! Team status state machine.
//!
//! The allowed moves live in one adjacency table consulted by [`transition`].
//! Re-applying the current status is always accepted and still audited.

use std::time::SystemTime;

use thiserror::Error;

use crate::dao::models::{PreviousStatus, StatusChangeEntity, TeamEntity, TeamStatus};

/// Actor recorded for check-ins performed at the venue entrance.
pub const ENTRY_SYSTEM_ACTOR: &str = "entry-system";
/// Placeholder stored when a removal or disqualification carries no reason.
pub const DEFAULT_REASON: &str = "No reason provided";
const CHECK_IN_REASON: &str = "Team checked in";

/// Statuses reachable from `from`, not counting the no-op re-apply.
pub fn allowed_targets(from: TeamStatus) -> &'static [TeamStatus] {
    match from {
        TeamStatus::Pending => &[TeamStatus::Arrived, TeamStatus::Removed],
        TeamStatus::Arrived => &[
            TeamStatus::Removed,
            TeamStatus::Disqualified,
            TeamStatus::Eliminated,
        ],
        TeamStatus::Removed | TeamStatus::Disqualified => &[TeamStatus::Arrived],
        TeamStatus::Eliminated => &[],
    }
}

/// Whether a team in `from` may move to `to`.
pub fn can_transition(from: TeamStatus, to: TeamStatus) -> bool {
    from == to || allowed_targets(from).contains(&to)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: TeamStatus,
    pub to: TeamStatus,
}

/// Apply a status change to `team`, recording one history entry.
///
/// The team is left untouched when the move is not in the table.
pub fn transition(
    team: &mut TeamEntity,
    target: TeamStatus,
    reason: Option<&str>,
    actor: &str,
    now: SystemTime,
) -> Result<(), InvalidTransition> {
    let from = team.status;
    if !can_transition(from, target) {
        return Err(InvalidTransition { from, to: target });
    }

    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    match target {
        TeamStatus::Removed => {
            team.removal_reason = Some(reason.unwrap_or(DEFAULT_REASON).to_owned());
        }
        TeamStatus::Disqualified => {
            team.disqualification_reason = Some(reason.unwrap_or(DEFAULT_REASON).to_owned());
        }
        TeamStatus::Arrived if matches!(from, TeamStatus::Removed | TeamStatus::Disqualified) => {
            team.removal_reason = None;
            team.disqualification_reason = None;
            team.arrival_timestamp = Some(now);
        }
        TeamStatus::Arrived => {
            team.arrival_timestamp.get_or_insert(now);
        }
        TeamStatus::Pending | TeamStatus::Eliminated => {}
    }

    team.status = target;
    let reason = reason.map_or_else(|| format!("Status changed to {target}"), str::to_owned);
    record(team, from.into(), reason, actor, now);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CheckInError {
    #[error("team already checked in")]
    AlreadyArrived,
    #[error("eliminated teams cannot check in")]
    Eliminated,
}

/// Mark a team as arrived at the venue.
pub fn check_in(team: &mut TeamEntity, now: SystemTime) -> Result<(), CheckInError> {
    let from = team.status;
    match from {
        TeamStatus::Arrived => return Err(CheckInError::AlreadyArrived),
        TeamStatus::Eliminated => return Err(CheckInError::Eliminated),
        TeamStatus::Removed | TeamStatus::Disqualified => {
            team.removal_reason = None;
            team.disqualification_reason = None;
        }
        TeamStatus::Pending => {}
    }

    team.status = TeamStatus::Arrived;
    team.arrival_timestamp = Some(now);
    record(
        team,
        from.into(),
        CHECK_IN_REASON.to_owned(),
        ENTRY_SYSTEM_ACTOR,
        now,
    );
    Ok(())
}

/// Append an audit entry for the team's current status.
pub(crate) fn record(
    team: &mut TeamEntity,
    previous_status: PreviousStatus,
    reason: String,
    actor: &str,
    now: SystemTime,
) {
    team.status_history.push(StatusChangeEntity {
        status: team.status,
        reason,
        timestamp: now,
        admin: actor.to_owned(),
        previous_status,
    });
    team.updated_at = now;
}
