use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::round::{
        DisplayRequest, PixelDisplayView, RoundStateResponse, SetRoundRequest, SetRoundResponse,
        TimerActionRequest, TimerActionResponse,
    },
    error::AppError,
    services::round_service,
    state::SharedState,
};

/// Round, timer and lobby display endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/round", get(get_round_state))
        .route("/round/set", post(set_round))
        .route("/round/timer", post(timer_action))
        .route("/round/message", get(get_display).post(set_display))
}

/// Current round plus the whole competition state, timers computed at read time.
#[utoipa::path(
    get,
    path = "/api/ignite2/round",
    tag = "round",
    responses(
        (status = 200, description = "Competition state", body = RoundStateResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_round_state(
    State(state): State<SharedState>,
) -> Result<Json<RoundStateResponse>, AppError> {
    Ok(Json(round_service::get_round_state(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/ignite2/round/set",
    tag = "round",
    request_body = SetRoundRequest,
    responses(
        (status = 200, description = "Round changed", body = SetRoundResponse),
        (status = 400, description = "Round must be 1 or 2")
    )
)]
pub async fn set_round(
    State(state): State<SharedState>,
    Json(payload): Json<SetRoundRequest>,
) -> Result<Json<SetRoundResponse>, AppError> {
    Ok(Json(round_service::set_round(&state, payload).await?))
}

/// Start, pause, reset or set the timer of a round.
#[utoipa::path(
    post,
    path = "/api/ignite2/round/timer",
    tag = "round",
    request_body = TimerActionRequest,
    responses(
        (status = 200, description = "Timer updated", body = TimerActionResponse),
        (status = 400, description = "Invalid round, action or duration")
    )
)]
pub async fn timer_action(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<TimerActionRequest>>,
) -> Result<Json<TimerActionResponse>, AppError> {
    Ok(Json(round_service::timer_action(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/ignite2/round/message",
    tag = "round",
    responses((status = 200, description = "Current lobby display", body = PixelDisplayView))
)]
pub async fn get_display(
    State(state): State<SharedState>,
) -> Result<Json<PixelDisplayView>, AppError> {
    Ok(Json(round_service::get_display(&state).await?))
}

/// Replace the opaque lobby display blob.
#[utoipa::path(
    post,
    path = "/api/ignite2/round/message",
    tag = "round",
    request_body = DisplayRequest,
    responses((status = 200, description = "Display updated", body = PixelDisplayView))
)]
pub async fn set_display(
    State(state): State<SharedState>,
    Json(payload): Json<DisplayRequest>,
) -> Result<Json<PixelDisplayView>, AppError> {
    Ok(Json(round_service::set_display(&state, payload).await?))
}
