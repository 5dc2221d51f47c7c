//! Round, timer and display DTOs.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{CompetitionStateEntity, PixelDisplayEntity, TimerEntity, epoch_millis},
    dto::{format_optional, format_system_time, validation::validate_not_blank},
    state::timer::remaining_at,
};

/// Timer as persisted, plus the remaining time computed at read time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimerView {
    pub duration: u64,
    /// Stored remaining seconds; only meaningful while stopped.
    pub remaining: u64,
    pub is_running: bool,
    pub started_at: Option<String>,
    pub paused_at: Option<String>,
    pub end_time: Option<String>,
    /// Epoch milliseconds of the last timer action.
    #[serde(rename = "lastReset")]
    pub last_reset: u64,
    /// Authoritative remaining seconds at `server_time_ms`.
    pub remaining_now: u64,
    /// Epoch milliseconds of the end time, for client-side countdowns.
    pub end_time_ms: Option<u64>,
    pub server_time_ms: u64,
}

impl TimerView {
    /// Snapshot of `timer` as seen at `now`.
    pub fn at(timer: &TimerEntity, now: SystemTime) -> Self {
        Self {
            duration: timer.duration,
            remaining: timer.remaining,
            is_running: timer.is_running,
            started_at: format_optional(timer.started_at),
            paused_at: format_optional(timer.paused_at),
            end_time: format_optional(timer.end_time),
            last_reset: timer.last_reset,
            remaining_now: remaining_at(timer, now),
            end_time_ms: timer.end_time.map(epoch_millis),
            server_time_ms: epoch_millis(now),
        }
    }
}

/// Opaque lobby display blob.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PixelDisplayView {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: String,
    pub timestamp: u64,
}

impl From<PixelDisplayEntity> for PixelDisplayView {
    fn from(value: PixelDisplayEntity) -> Self {
        Self {
            kind: value.kind,
            payload: value.payload,
            timestamp: value.timestamp,
        }
    }
}

/// Competition singleton with both timers evaluated at read time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CompetitionStateView {
    pub event_id: String,
    pub current_round: u8,
    pub round_1_timer: TimerView,
    pub round_2_timer: TimerView,
    pub round_1_end_time: Option<String>,
    pub round_2_start_time: Option<String>,
    #[serde(rename = "pixelDisplay")]
    pub pixel_display: PixelDisplayView,
    pub version: u64,
    pub updated_at: String,
}

impl CompetitionStateView {
    /// Read model of `state` with timers evaluated at `now`.
    pub fn at(state: CompetitionStateEntity, now: SystemTime) -> Self {
        Self {
            round_1_timer: TimerView::at(&state.round_1_timer, now),
            round_2_timer: TimerView::at(&state.round_2_timer, now),
            event_id: state.event_id,
            current_round: state.current_round.number(),
            round_1_end_time: format_optional(state.round_1_end_time),
            round_2_start_time: format_optional(state.round_2_start_time),
            pixel_display: state.pixel_display.into(),
            version: state.version,
            updated_at: format_system_time(state.updated_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoundStateResponse {
    pub current_round: u8,
    pub competition_state: CompetitionStateView,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoundRequest {
    /// 1 or 2.
    pub round: Option<i64>,
    pub admin: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SetRoundResponse {
    pub competition_state: CompetitionStateView,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TimerActionRequest {
    pub round: Option<i64>,
    /// `start`, `pause`, `reset` or `set`.
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "action is required"))]
    pub action: String,
    /// Seconds; required by `set`.
    pub duration: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimerActionResponse {
    pub round: u8,
    pub timer_state: TimerView,
    pub message: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DisplayRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub payload: Option<String>,
}
