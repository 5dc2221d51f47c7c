use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::{PreviousStatus, TeamStatus},
    dto::round::{PixelDisplayView, TimerView},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    #[cfg(test)]
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// First message sent to an SSE client when it connects.
pub struct Handshake {
    pub stream: String,
    pub message: String,
    /// Whether the backend is running without a storage connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamRegisteredEvent {
    pub team_id: String,
    pub name: String,
    pub track: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamStatusChangedEvent {
    pub team_id: String,
    pub status: TeamStatus,
    pub previous_status: PreviousStatus,
    pub actor: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamsPromotedEvent {
    pub promoted: Vec<String>,
    pub eliminated: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompetitionResetEvent {
    pub teams_reset: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoundChangedEvent {
    pub current_round: u8,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimerUpdatedEvent {
    pub round: u8,
    pub action: String,
    pub timer: TimerView,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DisplayUpdatedEvent(pub PixelDisplayView);
