//! Global lobby reset.

use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dto::team::{ResetRequest, ResetResponse},
    error::ServiceError,
    services::{
        round_service, sse_events,
        team_service::{resolve_actor, save_team},
    },
    state::{SharedState, reset},
};

/// Put every team back to `pending` and the competition back to round 1.
///
/// Refused unless `confirm` matches the configured token exactly.
pub async fn reset_competition(
    state: &SharedState,
    request: ResetRequest,
) -> Result<ResetResponse, ServiceError> {
    let token = &state.config().reset_confirmation;
    if request.confirm != *token {
        warn!("lobby reset attempted without confirmation");
        return Err(ServiceError::Validation(format!(
            "send {{ confirm: \"{token}\" }} to confirm this action"
        )));
    }

    let actor = resolve_actor(state, request.admin.as_deref());
    let store = state.require_store().await?;
    let _bulk = state.enter_bulk().await;

    let now = SystemTime::now();
    let mut teams_reset = 0u64;
    for mut team in store.list_teams().await? {
        reset::reset_team(&mut team, &actor, now);
        save_team(store.as_ref(), team).await?;
        teams_reset += 1;
    }

    let duration = state.config().default_timer_duration_secs;
    round_service::update_competition(state, |competition, now| {
        reset::reset_competition(competition, duration, now);
        Ok(())
    })
    .await?;

    info!(teams_reset, actor = %actor, "lobby reset");
    sse_events::broadcast_competition_reset(state, teams_reset);

    Ok(ResetResponse {
        teams_reset,
        message: format!("Lobby reset complete. {teams_reset} teams set to pending."),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            competition_store::{CompetitionStore, MemoryStore},
            models::{PreviousStatus, Round, TeamStatus},
        },
        dto::round::{SetRoundRequest, TimerActionRequest},
        state::AppState,
        test_support::team,
    };

    fn confirm(token: &str) -> ResetRequest {
        ResetRequest {
            confirm: token.into(),
            admin: None,
        }
    }

    #[tokio::test]
    async fn requires_exact_confirmation() {
        let store = MemoryStore::new();
        store.insert_team(team("team-001", "Alpha")).await.unwrap();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone())).await;

        for token in ["", "reset", " RESET"] {
            assert!(matches!(
                reset_competition(&state, confirm(token)).await,
                Err(ServiceError::Validation(_))
            ));
        }
        let untouched = store.find_team("team-001".into()).await.unwrap().unwrap();
        assert_eq!(untouched.version, 0);
    }

    #[tokio::test]
    async fn resets_teams_and_competition() {
        let store = MemoryStore::new();
        let mut gone = team("team-001", "Alpha");
        gone.status = TeamStatus::Eliminated;
        gone.eliminated_round = Some(Round::One);
        gone.submission = "https://example.com".into();
        store.insert_team(gone).await.unwrap();
        store.insert_team(team("team-002", "Beta")).await.unwrap();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone())).await;

        round_service::set_round(
            &state,
            SetRoundRequest {
                round: Some(2),
                admin: None,
            },
        )
        .await
        .unwrap();
        round_service::timer_action(
            &state,
            TimerActionRequest {
                round: Some(2),
                action: "start".into(),
                duration: None,
            },
        )
        .await
        .unwrap();

        let response = reset_competition(&state, confirm("RESET")).await.unwrap();
        assert_eq!(response.teams_reset, 2);
        assert_eq!(response.message, "Lobby reset complete. 2 teams set to pending.");

        let reset_team = store.find_team("team-001".into()).await.unwrap().unwrap();
        assert_eq!(reset_team.status, TeamStatus::Pending);
        assert_eq!(reset_team.eliminated_round, None);
        assert!(reset_team.submission.is_empty());
        let last = reset_team.status_history.last().unwrap();
        assert_eq!(last.previous_status, PreviousStatus::Reset);
        assert_eq!(reset_team.status_history.len(), 2);

        let round = round_service::get_round_state(&state).await.unwrap();
        assert_eq!(round.current_round, 1);
        assert!(!round.competition_state.round_2_timer.is_running);
        assert!(round.competition_state.round_1_end_time.is_none());
        assert!(round.competition_state.round_2_timer.last_reset > 0);
    }
}
