use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::{PreviousStatus, Round, TeamEntity},
    dto::{
        round::{PixelDisplayView, TimerView},
        sse::{
            CompetitionResetEvent, DisplayUpdatedEvent, RoundChangedEvent, ServerEvent,
            SystemStatus, TeamRegisteredEvent, TeamStatusChangedEvent, TeamsPromotedEvent,
            TimerUpdatedEvent,
        },
    },
    state::{SharedState, timer::TimerAction},
};

pub const EVENT_TEAM_REGISTERED: &str = "team.registered";
pub const EVENT_TEAM_STATUS_CHANGED: &str = "team.status_changed";
pub const EVENT_TEAMS_PROMOTED: &str = "teams.promoted";
pub const EVENT_COMPETITION_RESET: &str = "competition.reset";
pub const EVENT_ROUND_CHANGED: &str = "round.changed";
pub const EVENT_TIMER_UPDATED: &str = "timer.updated";
pub const EVENT_DISPLAY_UPDATED: &str = "display.updated";
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Announce a new `pending` team.
pub fn broadcast_team_registered(state: &SharedState, team: &TeamEntity) {
    let payload = TeamRegisteredEvent {
        team_id: team.id.clone(),
        name: team.name.clone(),
        track: team.track.clone(),
    };
    send_public_event(state, EVENT_TEAM_REGISTERED, &payload);
}

/// Announce the latest history entry of `team`.
pub fn broadcast_status_changed(state: &SharedState, team: &TeamEntity) {
    let (previous_status, actor) = team
        .status_history
        .last()
        .map(|entry| (entry.previous_status, entry.admin.clone()))
        .unwrap_or((PreviousStatus::from(team.status), String::new()));
    let payload = TeamStatusChangedEvent {
        team_id: team.id.clone(),
        status: team.status,
        previous_status,
        actor,
    };
    send_public_event(state, EVENT_TEAM_STATUS_CHANGED, &payload);
}

/// Announce the outcome of a promotion by team id.
pub fn broadcast_teams_promoted(
    state: &SharedState,
    promoted: Vec<String>,
    eliminated: Vec<String>,
) {
    let payload = TeamsPromotedEvent {
        promoted,
        eliminated,
    };
    send_public_event(state, EVENT_TEAMS_PROMOTED, &payload);
}

/// Announce a completed lobby reset.
pub fn broadcast_competition_reset(state: &SharedState, teams_reset: u64) {
    send_public_event(
        state,
        EVENT_COMPETITION_RESET,
        &CompetitionResetEvent { teams_reset },
    );
}

/// Announce the new current round.
pub fn broadcast_round_changed(state: &SharedState, round: Round) {
    let payload = RoundChangedEvent {
        current_round: round.number(),
    };
    send_public_event(state, EVENT_ROUND_CHANGED, &payload);
}

/// Announce a timer action with the resulting timer state.
pub fn broadcast_timer_updated(
    state: &SharedState,
    round: Round,
    action: TimerAction,
    timer: &TimerView,
) {
    let payload = TimerUpdatedEvent {
        round: round.number(),
        action: action.to_string(),
        timer: timer.clone(),
    };
    send_public_event(state, EVENT_TIMER_UPDATED, &payload);
}

/// Push the new lobby display blob.
pub fn broadcast_display_updated(state: &SharedState, display: &PixelDisplayView) {
    send_public_event(
        state,
        EVENT_DISPLAY_UPDATED,
        &DisplayUpdatedEvent(display.clone()),
    );
}

/// Tell listeners the backend entered or left degraded mode.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
