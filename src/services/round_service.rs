//! Round, timer and lobby display commands on the competition singleton.

use std::time::SystemTime;

use tracing::{debug, info};

use crate::{
    config::AppConfig,
    dao::{
        competition_store::CompetitionStore,
        models::{CompetitionStateEntity, PixelDisplayEntity, Round, epoch_millis},
    },
    dto::round::{
        CompetitionStateView, DisplayRequest, PixelDisplayView, RoundStateResponse,
        SetRoundRequest, SetRoundResponse, TimerActionRequest, TimerActionResponse, TimerView,
    },
    error::ServiceError,
    services::{sse_events, team_service::resolve_actor},
    state::{
        SharedState, round,
        timer::{self, TimerAction, TimerCommand},
    },
};

/// Load the competition singleton, creating it on first use.
pub async fn ensure_initialized(
    store: &dyn CompetitionStore,
    config: &AppConfig,
) -> Result<CompetitionStateEntity, ServiceError> {
    if let Some(existing) = store.find_competition(config.event_id.clone()).await? {
        return Ok(existing);
    }

    let fresh = CompetitionStateEntity::new(
        config.event_id.clone(),
        config.default_timer_duration_secs,
        SystemTime::now(),
    );
    if store.insert_competition(fresh.clone()).await? {
        info!(event_id = %config.event_id, "competition state initialised");
        return Ok(fresh);
    }

    // Another instance created it first.
    store
        .find_competition(config.event_id.clone())
        .await?
        .ok_or_else(|| ServiceError::concurrent_update("competition state"))
}

async fn save_competition(
    store: &dyn CompetitionStore,
    mut competition: CompetitionStateEntity,
) -> Result<CompetitionStateEntity, ServiceError> {
    let expected = competition.version;
    competition.version += 1;
    if store
        .replace_competition(competition.clone(), expected)
        .await?
    {
        Ok(competition)
    } else {
        debug!(expected, "competition version moved underneath us");
        Err(ServiceError::concurrent_update("competition state"))
    }
}

/// Load, mutate and persist the singleton under the competition gate.
/// Nothing is written when `mutate` fails.
pub(crate) async fn update_competition<F>(
    state: &SharedState,
    mutate: F,
) -> Result<CompetitionStateEntity, ServiceError>
where
    F: FnOnce(&mut CompetitionStateEntity, SystemTime) -> Result<(), ServiceError>,
{
    let store = state.require_store().await?;
    let _gate = state.lock_competition().await;
    let mut competition = ensure_initialized(store.as_ref(), state.config()).await?;
    mutate(&mut competition, SystemTime::now())?;
    save_competition(store.as_ref(), competition).await
}

fn parse_round(raw: Option<i64>) -> Result<Round, ServiceError> {
    let raw = raw.ok_or_else(|| ServiceError::Validation("round must be 1 or 2".into()))?;
    Ok(Round::try_from(raw)?)
}

pub async fn get_round_state(state: &SharedState) -> Result<RoundStateResponse, ServiceError> {
    let store = state.require_store().await?;
    let competition = ensure_initialized(store.as_ref(), state.config()).await?;
    Ok(RoundStateResponse {
        current_round: competition.current_round.number(),
        competition_state: CompetitionStateView::at(competition, SystemTime::now()),
    })
}

/// Move the competition to another round.
pub async fn set_round(
    state: &SharedState,
    request: SetRoundRequest,
) -> Result<SetRoundResponse, ServiceError> {
    let target = parse_round(request.round)?;
    let actor = resolve_actor(state, request.admin.as_deref());
    let competition = update_competition(state, |competition, now| {
        round::enter_round(competition, target, now);
        Ok(())
    })
    .await?;

    info!(round = %target, actor = %actor, "round changed");
    sse_events::broadcast_round_changed(state, target);

    Ok(SetRoundResponse {
        competition_state: CompetitionStateView::at(competition, SystemTime::now()),
        message: format!("Round set to {target}"),
    })
}

/// Drive the timer of one round.
pub async fn timer_action(
    state: &SharedState,
    request: TimerActionRequest,
) -> Result<TimerActionResponse, ServiceError> {
    let target = parse_round(request.round)?;
    let action: TimerAction = request.action.trim().parse()?;
    let command = TimerCommand::parse(action, request.duration)?;

    let competition = update_competition(state, |competition, now| {
        timer::apply(competition.timer_mut(target), command, now)?;
        competition.updated_at = now;
        Ok(())
    })
    .await?;

    let view = TimerView::at(competition.timer(target), SystemTime::now());
    info!(round = %target, %action, remaining = view.remaining_now, "timer updated");
    sse_events::broadcast_timer_updated(state, target, action, &view);

    Ok(TimerActionResponse {
        round: target.number(),
        timer_state: view,
        message: format!("Timer {action} successful for round {target}"),
    })
}

pub async fn get_display(state: &SharedState) -> Result<PixelDisplayView, ServiceError> {
    let store = state.require_store().await?;
    let competition = ensure_initialized(store.as_ref(), state.config()).await?;
    Ok(competition.pixel_display.into())
}

/// Replace the lobby display blob. Missing fields fall back to a blank text display.
pub async fn set_display(
    state: &SharedState,
    request: DisplayRequest,
) -> Result<PixelDisplayView, ServiceError> {
    let kind = request
        .kind
        .map(|kind| kind.trim().to_owned())
        .filter(|kind| !kind.is_empty())
        .unwrap_or_else(|| PixelDisplayEntity::default().kind);
    let payload = request.payload.unwrap_or_default();

    let competition = update_competition(state, move |competition, now| {
        competition.pixel_display = PixelDisplayEntity {
            kind,
            payload,
            timestamp: epoch_millis(now),
        };
        competition.updated_at = now;
        Ok(())
    })
    .await?;

    let view = PixelDisplayView::from(competition.pixel_display);
    debug!(kind = %view.kind, "pixel display updated");
    sse_events::broadcast_display_updated(state, &view);
    Ok(view)
}
