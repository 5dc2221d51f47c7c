use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::team::{
        ChangeStatusRequest, CheckInRequest, PromoteRequest, PromotionResponse,
        RegisterTeamRequest, ResetRequest, ResetResponse, SubmitRequest, TeamActionResponse,
        TeamListResponse, TeamView, TeamsQuery,
    },
    error::AppError,
    services::{promotion_service, reset_service, team_service},
    state::SharedState,
};

/// Team roster, lifecycle and reset endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/teams", get(list_teams))
        .route("/teams/register", post(register_team))
        .route("/teams/status", post(change_status))
        .route("/teams/check-in", post(check_in))
        .route("/teams/promote", post(promote))
        .route("/teams/submit", post(submit))
        .route("/teams/{id}", get(get_team))
        .route("/reset", post(reset))
}

/// List teams with optional filters and per-status counts.
#[utoipa::path(
    get,
    path = "/api/ignite2/teams",
    tag = "teams",
    params(TeamsQuery),
    responses(
        (status = 200, description = "Filtered roster", body = TeamListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn list_teams(
    State(state): State<SharedState>,
    Query(query): Query<TeamsQuery>,
) -> Result<Json<TeamListResponse>, AppError> {
    Ok(Json(team_service::list_teams(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/ignite2/teams/{id}",
    tag = "teams",
    params(("id" = String, Path, description = "Team identifier, e.g. team-001")),
    responses(
        (status = 200, description = "Team", body = TeamView),
        (status = 404, description = "Unknown team")
    )
)]
pub async fn get_team(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<TeamView>, AppError> {
    Ok(Json(team_service::get_team(&state, &id).await?))
}

/// Register a new team in `pending`.
#[utoipa::path(
    post,
    path = "/api/ignite2/teams/register",
    tag = "teams",
    request_body = RegisterTeamRequest,
    responses(
        (status = 201, description = "Team registered", body = TeamActionResponse),
        (status = 400, description = "Invalid registration"),
        (status = 409, description = "Team name already taken")
    )
)]
pub async fn register_team(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterTeamRequest>>,
) -> Result<(StatusCode, Json<TeamActionResponse>), AppError> {
    let response = team_service::register_team(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Move a team to another status through the transition table.
#[utoipa::path(
    post,
    path = "/api/ignite2/teams/status",
    tag = "teams",
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = TeamActionResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Unknown team"),
        (status = 409, description = "Transition not allowed or concurrent update")
    )
)]
pub async fn change_status(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ChangeStatusRequest>>,
) -> Result<Json<TeamActionResponse>, AppError> {
    Ok(Json(team_service::change_status(&state, payload).await?))
}

/// Entrance check-in.
#[utoipa::path(
    post,
    path = "/api/ignite2/teams/check-in",
    tag = "teams",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Team checked in", body = TeamActionResponse),
        (status = 404, description = "Unknown team"),
        (status = 409, description = "Already arrived or eliminated")
    )
)]
pub async fn check_in(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CheckInRequest>>,
) -> Result<Json<TeamActionResponse>, AppError> {
    Ok(Json(team_service::check_in(&state, payload).await?))
}

/// Promote selected arrived teams to round 2 and eliminate the rest.
#[utoipa::path(
    post,
    path = "/api/ignite2/teams/promote",
    tag = "teams",
    request_body = PromoteRequest,
    responses(
        (status = 200, description = "Promotion applied", body = PromotionResponse),
        (status = 400, description = "Empty selection or empty pool"),
        (status = 409, description = "Concurrent update")
    )
)]
pub async fn promote(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PromoteRequest>>,
) -> Result<Json<PromotionResponse>, AppError> {
    Ok(Json(promotion_service::promote(&state, payload).await?))
}

/// Record a project submission.
#[utoipa::path(
    post,
    path = "/api/ignite2/teams/submit",
    tag = "teams",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Submission stored", body = TeamActionResponse),
        (status = 400, description = "Invalid URL or round"),
        (status = 403, description = "Submission deadline has expired"),
        (status = 404, description = "Unknown team")
    )
)]
pub async fn submit(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubmitRequest>>,
) -> Result<Json<TeamActionResponse>, AppError> {
    Ok(Json(team_service::submit(&state, payload).await?))
}

/// Reset every team to `pending` and the competition to round 1.
#[utoipa::path(
    post,
    path = "/api/ignite2/reset",
    tag = "teams",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Lobby reset", body = ResetResponse),
        (status = 400, description = "Missing confirmation")
    )
)]
pub async fn reset(
    State(state): State<SharedState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, AppError> {
    Ok(Json(reset_service::reset_competition(&state, payload).await?))
}
