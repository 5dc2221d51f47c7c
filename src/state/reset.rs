//! Lobby reset of team records and the competition singleton.

use std::time::SystemTime;

use crate::{
    dao::models::{
        CompetitionStateEntity, PreviousStatus, Round, TeamEntity, TeamStatus, TimerEntity,
        epoch_millis,
    },
    state::status::record,
};

pub const RESET_REASON: &str = "Lobby reset by admin";

/// Put `team` back in the lobby as if it had just registered, keeping its history.
pub fn reset_team(team: &mut TeamEntity, actor: &str, now: SystemTime) {
    team.status = TeamStatus::Pending;
    team.arrival_timestamp = None;
    team.current_round = Round::One;
    team.promoted_to_round_2 = false;
    team.eliminated_round = None;
    team.removal_reason = None;
    team.disqualification_reason = None;
    team.submission.clear();
    team.submission_timestamp = None;
    team.submission_round = None;
    team.votes_received = 0;
    record(
        team,
        PreviousStatus::Reset,
        RESET_REASON.to_owned(),
        actor,
        now,
    );
}

/// Return the competition to round 1 with both timers stopped at
/// `timer_duration` seconds. The pixel display blob is preserved.
pub fn reset_competition(
    state: &mut CompetitionStateEntity,
    timer_duration: u64,
    now: SystemTime,
) {
    let mut timer = TimerEntity::stopped(timer_duration);
    timer.last_reset = epoch_millis(now);

    state.current_round = Round::One;
    state.round_1_timer = timer.clone();
    state.round_2_timer = timer;
    state.round_1_end_time = None;
    state.round_2_start_time = None;
    state.updated_at = now;
}
