//! Team roster commands: registration, status changes, check-in and submissions.

use std::time::SystemTime;

use tracing::{debug, info};

use crate::{
    dao::{
        competition_store::CompetitionStore,
        models::{
            MemberEntity, PreviousStatus, Round, StatusChangeEntity, TeamEntity, TeamStatus,
        },
    },
    dto::team::{
        ChangeStatusRequest, CheckInRequest, MemberInput, RegisterTeamRequest, StatusCounts,
        SubmitRequest, TeamActionResponse, TeamListResponse, TeamView, TeamsQuery,
    },
    error::ServiceError,
    services::{round_service, sse_events},
    state::{SharedState, status, timer},
};

const REGISTRATION_ACTOR: &str = "registration";
const REGISTRATION_REASON: &str = "Team registered";
const MAX_ID_ATTEMPTS: u64 = 1_000;

/// Actor named in the request, or the configured default.
pub(crate) fn resolve_actor(state: &SharedState, requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|actor| !actor.is_empty())
        .map_or_else(|| state.config().default_actor.clone(), str::to_owned)
}

pub(crate) async fn load_team(
    store: &dyn CompetitionStore,
    team_id: &str,
) -> Result<TeamEntity, ServiceError> {
    store
        .find_team(team_id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))
}

/// Persist `team` over the version it was loaded at.
pub(crate) async fn save_team(
    store: &dyn CompetitionStore,
    mut team: TeamEntity,
) -> Result<TeamEntity, ServiceError> {
    let expected = team.version;
    team.version += 1;
    if store.replace_team(team.clone(), expected).await? {
        Ok(team)
    } else {
        debug!(team_id = %team.id, expected, "team version moved underneath us");
        Err(ServiceError::concurrent_update(&format!("team `{}`", team.id)))
    }
}

fn require_team_id(raw: &str) -> Result<String, ServiceError> {
    let team_id = raw.trim();
    if team_id.is_empty() {
        return Err(ServiceError::Validation("team_id is required".into()));
    }
    Ok(team_id.to_owned())
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<TeamStatus>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => Ok(Some(value.parse()?)),
    }
}

fn matches_search(team: &TeamEntity, needle: &str) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
    contains(&team.name)
        || contains(&team.track)
        || team
            .members
            .iter()
            .any(|member| contains(&member.name) || contains(&member.roll))
}

/// List teams with optional status, search and track filters. Counts always
/// cover the whole roster.
pub async fn list_teams(
    state: &SharedState,
    query: TeamsQuery,
) -> Result<TeamListResponse, ServiceError> {
    let status = parse_status_filter(query.status.as_deref())?;
    let store = state.require_store().await?;
    let teams = store.list_teams().await?;
    let by_status = StatusCounts::tally(&teams);

    let search = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let track = query
        .track
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let teams: Vec<TeamView> = teams
        .into_iter()
        .filter(|team| status.is_none_or(|s| team.status == s))
        .filter(|team| search.as_deref().is_none_or(|s| matches_search(team, s)))
        .filter(|team| track.is_none_or(|t| team.track == t))
        .map(Into::into)
        .collect();

    Ok(TeamListResponse {
        total: teams.len(),
        teams,
        by_status,
    })
}

pub async fn get_team(state: &SharedState, team_id: &str) -> Result<TeamView, ServiceError> {
    let store = state.require_store().await?;
    Ok(load_team(store.as_ref(), team_id.trim()).await?.into())
}

fn clean_members(members: Vec<MemberInput>) -> Vec<MemberEntity> {
    let trimmed = |value: Option<String>| value.map(|v| v.trim().to_owned()).unwrap_or_default();
    members
        .into_iter()
        .filter(|member| !member.name.trim().is_empty())
        .map(|member| MemberEntity {
            name: member.name.trim().to_owned(),
            roll: trimmed(member.roll),
            phone: trimmed(member.phone),
            email: trimmed(member.email),
        })
        .collect()
}

/// Register a new team in `pending`.
pub async fn register_team(
    state: &SharedState,
    request: RegisterTeamRequest,
) -> Result<TeamActionResponse, ServiceError> {
    let name = request.name.trim().to_owned();
    let track = request.track.trim().to_owned();
    if name.is_empty() || track.is_empty() {
        return Err(ServiceError::Validation("team name and track are required".into()));
    }
    let members = clean_members(request.members);
    if members.is_empty() {
        return Err(ServiceError::Validation("at least one member must have a name".into()));
    }

    let store = state.require_store().await?;
    let _single = state.enter_single().await;
    let _registration = state.lock_registration().await;

    let existing = store.list_teams().await?;
    let lowered = name.to_lowercase();
    if existing.iter().any(|team| {
        matches!(team.status, TeamStatus::Pending | TeamStatus::Arrived)
            && team.name.to_lowercase() == lowered
    }) {
        debug!(name = %name, "duplicate team name rejected");
        return Err(ServiceError::Conflict(
            "a team with this name already exists".into(),
        ));
    }

    let now = SystemTime::now();
    let mut next = store.count_teams().await? + 1;
    for _ in 0..MAX_ID_ATTEMPTS {
        let team = TeamEntity {
            id: format!("team-{next:03}"),
            name: name.clone(),
            track: track.clone(),
            members: members.clone(),
            status: TeamStatus::Pending,
            arrival_timestamp: None,
            current_round: Round::One,
            promoted_to_round_2: false,
            eliminated_round: None,
            removal_reason: None,
            disqualification_reason: None,
            status_history: vec![StatusChangeEntity {
                status: TeamStatus::Pending,
                reason: REGISTRATION_REASON.to_owned(),
                timestamp: now,
                admin: REGISTRATION_ACTOR.to_owned(),
                previous_status: PreviousStatus::New,
            }],
            submission: String::new(),
            submission_timestamp: None,
            submission_round: None,
            votes_received: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        if store.insert_team(team.clone()).await? {
            info!(team_id = %team.id, name = %team.name, track = %team.track, "team registered");
            sse_events::broadcast_team_registered(state, &team);
            let message = format!("Team \"{}\" registered as {}", team.name, team.id);
            return Ok(TeamActionResponse {
                team: team.into(),
                message,
            });
        }
        next += 1;
    }

    Err(ServiceError::Conflict(
        "could not allocate a team id; retry".into(),
    ))
}

/// Admin status change through the transition table.
pub async fn change_status(
    state: &SharedState,
    request: ChangeStatusRequest,
) -> Result<TeamActionResponse, ServiceError> {
    let team_id = require_team_id(&request.team_id)?;
    let target: TeamStatus = request.new_status.trim().parse()?;
    let actor = resolve_actor(state, request.admin.as_deref());

    let store = state.require_store().await?;
    let _single = state.enter_single().await;
    let _team = state.lock_team(&team_id).await;

    let mut team = load_team(store.as_ref(), &team_id).await?;
    let previous = team.status;
    if let Err(err) = status::transition(
        &mut team,
        target,
        request.reason.as_deref(),
        &actor,
        SystemTime::now(),
    ) {
        debug!(team_id = %team_id, error = %err, "status change rejected");
        return Err(err.into());
    }

    let team = save_team(store.as_ref(), team).await?;
    info!(
        team_id = %team.id,
        from = %previous,
        to = %target,
        actor = %actor,
        "team status changed"
    );
    sse_events::broadcast_status_changed(state, &team);

    Ok(TeamActionResponse {
        team: team.into(),
        message: format!("Team status updated to {target}"),
    })
}

/// Entrance check-in.
pub async fn check_in(
    state: &SharedState,
    request: CheckInRequest,
) -> Result<TeamActionResponse, ServiceError> {
    let team_id = require_team_id(&request.team_id)?;
    let store = state.require_store().await?;
    let _single = state.enter_single().await;
    let _team = state.lock_team(&team_id).await;

    let mut team = load_team(store.as_ref(), &team_id).await?;
    if let Err(err) = status::check_in(&mut team, SystemTime::now()) {
        debug!(team_id = %team_id, error = %err, "check-in rejected");
        return Err(err.into());
    }

    let team = save_team(store.as_ref(), team).await?;
    info!(team_id = %team.id, actor = status::ENTRY_SYSTEM_ACTOR, "team checked in");
    sse_events::broadcast_status_changed(state, &team);

    let message = format!("{} checked in successfully!", team.name);
    Ok(TeamActionResponse {
        team: team.into(),
        message,
    })
}

/// Record a project submission, refusing it once the round's timer has run out.
pub async fn submit(
    state: &SharedState,
    request: SubmitRequest,
) -> Result<TeamActionResponse, ServiceError> {
    let team_id = require_team_id(&request.team_id)?;
    let requested_round = request.round.map(Round::try_from).transpose()?;

    let store = state.require_store().await?;
    let competition = round_service::ensure_initialized(store.as_ref(), state.config()).await?;
    let round = requested_round.unwrap_or(competition.current_round);

    let now = SystemTime::now();
    if timer::has_expired(competition.timer(round), now) {
        debug!(team_id = %team_id, %round, "submission after deadline");
        return Err(ServiceError::Forbidden("submission deadline has expired".into()));
    }

    let _single = state.enter_single().await;
    let _team = state.lock_team(&team_id).await;
    let mut team = load_team(store.as_ref(), &team_id).await?;
    team.submission = request.submission_url.trim().to_owned();
    team.submission_timestamp = Some(now);
    team.submission_round = Some(round);
    team.updated_at = now;

    let team = save_team(store.as_ref(), team).await?;
    info!(team_id = %team.id, %round, "project submitted");

    Ok(TeamActionResponse {
        team: team.into(),
        message: "Submission successful!".into(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::competition_store::MemoryStore,
        state::AppState,
        test_support::{member, team},
    };

    async fn state_with(teams: Vec<TeamEntity>) -> (SharedState, MemoryStore) {
        let store = MemoryStore::new();
        for t in teams {
            store.insert_team(t).await.unwrap();
        }
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone())).await;
        (state, store)
    }

    fn register_request(name: &str) -> RegisterTeamRequest {
        RegisterTeamRequest {
            name: format!("  {name} "),
            track: "AI".into(),
            members: vec![
                MemberInput {
                    name: "  ".into(),
                    ..Default::default()
                },
                MemberInput {
                    name: " Ada ".into(),
                    roll: Some(" 21CS001 ".into()),
                    ..Default::default()
                },
            ],
        }
    }

    #[tokio::test]
    async fn registration_assigns_sequential_ids_and_seed_history() {
        let (state, _) = state_with(Vec::new()).await;
        let first = register_team(&state, register_request("Alpha")).await.unwrap();
        let second = register_team(&state, register_request("Beta")).await.unwrap();

        assert_eq!(first.team.id, "team-001");
        assert_eq!(second.team.id, "team-002");
        assert_eq!(first.team.name, "Alpha");
        assert_eq!(first.team.members.len(), 1);
        assert_eq!(first.team.members[0].roll, "21CS001");
        assert_eq!(first.team.status, TeamStatus::Pending);

        let seed = &first.team.status_history[0];
        assert_eq!(seed.admin, REGISTRATION_ACTOR);
        assert_eq!(seed.previous_status, PreviousStatus::New);
    }

    #[tokio::test]
    async fn registration_skips_taken_ids() {
        let (state, _) = state_with(vec![team("team-002", "Existing")]).await;
        let response = register_team(&state, register_request("Gamma")).await.unwrap();
        assert_eq!(response.team.id, "team-003");
    }

    #[tokio::test]
    async fn duplicate_active_names_are_rejected_case_insensitively() {
        let (state, _) = state_with(Vec::new()).await;
        register_team(&state, register_request("Alpha")).await.unwrap();
        let err = register_team(&state, register_request("ALPHA"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn eliminated_teams_free_their_name() {
        let mut gone = team("team-001", "Alpha");
        gone.status = TeamStatus::Eliminated;
        let (state, _) = state_with(vec![gone]).await;
        assert!(register_team(&state, register_request("alpha")).await.is_ok());
    }

    #[tokio::test]
    async fn registration_requires_a_named_member() {
        let (state, _) = state_with(Vec::new()).await;
        let mut request = register_request("Alpha");
        request.members.truncate(1);
        assert!(matches!(
            register_team(&state, request).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_and_counts() {
        let mut alpha = team("team-001", "Alpha");
        alpha.status = TeamStatus::Arrived;
        alpha.track = "Web".into();
        let mut beta = team("team-002", "Beta");
        beta.members = vec![member("Grace Hopper", "21CS042")];
        let gamma = team("team-003", "Gamma");
        let (state, _) = state_with(vec![alpha, beta, gamma]).await;

        let all = list_teams(&state, TeamsQuery::default()).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.by_status.pending, 2);
        assert_eq!(all.by_status.arrived, 1);

        let arrived = list_teams(
            &state,
            TeamsQuery {
                status: Some("arrived".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(arrived.total, 1);
        assert_eq!(arrived.by_status.all, 3);

        let by_roll = list_teams(
            &state,
            TeamsQuery {
                search: Some("cs042".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_roll.teams[0].id, "team-002");

        let by_track = list_teams(
            &state,
            TeamsQuery {
                track: Some("Web".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_track.total, 1);

        let err = list_teams(
            &state,
            TeamsQuery {
                status: Some("lost".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn status_change_persists_and_bumps_version() {
        let (state, store) = state_with(vec![team("team-001", "Alpha")]).await;
        let response = change_status(
            &state,
            ChangeStatusRequest {
                team_id: "team-001".into(),
                new_status: "removed".into(),
                reason: Some("no show".into()),
                admin: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.team.status, TeamStatus::Removed);

        let stored = store.find_team("team-001".into()).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.removal_reason.as_deref(), Some("no show"));
        assert_eq!(stored.status_history.last().unwrap().admin, "admin");
    }

    #[tokio::test]
    async fn status_change_errors() {
        let mut gone = team("team-001", "Alpha");
        gone.status = TeamStatus::Eliminated;
        let (state, store) = state_with(vec![gone]).await;

        let request = |team_id: &str, new_status: &str| ChangeStatusRequest {
            team_id: team_id.into(),
            new_status: new_status.into(),
            reason: None,
            admin: None,
        };

        assert!(matches!(
            change_status(&state, request("team-001", "arrived")).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            change_status(&state, request("team-404", "arrived")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            change_status(&state, request("team-001", "vanished")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            change_status(&state, request("  ", "arrived")).await,
            Err(ServiceError::Validation(_))
        ));

        let stored = store.find_team("team-001".into()).await.unwrap().unwrap();
        assert_eq!(stored.version, 0);
        assert_eq!(stored.status_history.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_status_changes_on_one_team_both_land() {
        let (state, store) = state_with(vec![team("team-001", "Alpha")]).await;
        let request = |reason: &str| ChangeStatusRequest {
            team_id: "team-001".into(),
            new_status: "arrived".into(),
            reason: Some(reason.into()),
            admin: Some("ops".into()),
        };

        let (first, second) = tokio::join!(
            change_status(&state, request("gate a")),
            change_status(&state, request("gate b")),
        );
        first.unwrap();
        second.unwrap();

        let stored = store.find_team("team-001".into()).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.status, TeamStatus::Arrived);
        assert_eq!(stored.status_history.len(), 3);
        assert_eq!(stored.status_history.last().unwrap().status, stored.status);
        let reasons: Vec<_> = stored.status_history[1..]
            .iter()
            .map(|entry| entry.reason.as_str())
            .collect();
        assert!(reasons.contains(&"gate a") && reasons.contains(&"gate b"));
    }

    #[tokio::test]
    async fn unknown_team_ids_leave_no_locks_behind() {
        let (state, _) = state_with(vec![team("team-001", "Alpha")]).await;
        for i in 0..50 {
            let err = check_in(
                &state,
                CheckInRequest {
                    team_id: format!("ghost-{i}"),
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ServiceError::NotFound(_)));
        }
        assert_eq!(state.team_lock_count(), 0);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let (_, store) = state_with(vec![team("team-001", "Alpha")]).await;
        let loaded = load_team(&store, "team-001").await.unwrap();
        save_team(&store, loaded.clone()).await.unwrap();

        let err = save_team(&store, loaded).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(message) if message.contains("retry")));
    }

    #[tokio::test]
    async fn check_in_twice_conflicts() {
        let (state, _) = state_with(vec![team("team-001", "Alpha")]).await;
        let request = || CheckInRequest {
            team_id: "team-001".into(),
        };
        let response = check_in(&state, request()).await.unwrap();
        assert!(response.team.checked_in);
        assert!(response.team.arrival_timestamp.is_some());
        assert!(matches!(
            check_in(&state, request()).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn submission_defaults_to_current_round() {
        let (state, store) = state_with(vec![team("team-001", "Alpha")]).await;
        let response = submit(
            &state,
            SubmitRequest {
                team_id: "team-001".into(),
                submission_url: "https://github.com/acme/demo".into(),
                round: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.team.submission_round, Some(1));

        let stored = store.find_team("team-001".into()).await.unwrap().unwrap();
        assert_eq!(stored.submission, "https://github.com/acme/demo");
        assert!(stored.submission_timestamp.is_some());
    }

    #[tokio::test]
    async fn submission_after_deadline_is_forbidden() {
        let (state, store) = state_with(vec![team("team-001", "Alpha")]).await;
        let mut competition =
            round_service::ensure_initialized(&store, state.config()).await.unwrap();
        let expected = competition.version;
        let long_ago = SystemTime::now() - std::time::Duration::from_secs(7_200);
        timer::apply(
            competition.timer_mut(Round::One),
            timer::TimerCommand::Start,
            long_ago,
        )
        .unwrap();
        competition.version += 1;
        assert!(store
            .replace_competition(competition, expected)
            .await
            .unwrap());

        let err = submit(
            &state,
            SubmitRequest {
                team_id: "team-001".into(),
                submission_url: "https://github.com/acme/demo".into(),
                round: Some(1),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = submit(
            &state,
            SubmitRequest {
                team_id: "team-001".into(),
                submission_url: "https://github.com/acme/demo".into(),
                round: Some(3),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
