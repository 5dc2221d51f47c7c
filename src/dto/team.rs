//! Request and response shapes for the team endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{MemberEntity, PreviousStatus, StatusChangeEntity, TeamEntity, TeamStatus},
    dto::{format_optional, format_system_time, validation::validate_not_blank},
};

/// Filters accepted by `GET /teams`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TeamsQuery {
    /// One of the team statuses, or `all`.
    pub status: Option<String>,
    /// Case-insensitive match on team name, track, member name or roll.
    pub search: Option<String>,
    /// Exact track name.
    pub track: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MemberInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roll: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Registration form submitted by a team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterTeamRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "Team name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "Track is required"))]
    pub track: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "At least one member is required"))]
    pub members: Vec<MemberInput>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangeStatusRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "team_id is required"))]
    pub team_id: String,
    /// Target status name.
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "new_status is required"))]
    pub new_status: String,
    pub reason: Option<String>,
    pub admin: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CheckInRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "team_id is required"))]
    pub team_id: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PromoteRequest {
    /// Teams that advance; every other arrived round 1 team is eliminated.
    #[serde(default)]
    #[validate(length(min = 1, message = "team_ids must be a non-empty array"))]
    pub team_ids: Vec<String>,
    pub admin: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "team_id is required"))]
    pub team_id: String,
    #[serde(default)]
    #[validate(url(message = "submission_url must be a valid URL"))]
    pub submission_url: String,
    /// Defaults to the competition's current round.
    pub round: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ResetRequest {
    /// Must equal the configured confirmation token (`RESET` by default).
    #[serde(default)]
    pub confirm: String,
    pub admin: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberView {
    pub name: String,
    pub roll: String,
    pub phone: String,
    pub email: String,
}

impl From<MemberEntity> for MemberView {
    fn from(value: MemberEntity) -> Self {
        Self {
            name: value.name,
            roll: value.roll,
            phone: value.phone,
            email: value.email,
        }
    }
}

/// One audit entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusChangeView {
    pub status: TeamStatus,
    pub reason: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub admin: String,
    pub previous_status: PreviousStatus,
}

impl From<StatusChangeEntity> for StatusChangeView {
    fn from(value: StatusChangeEntity) -> Self {
        Self {
            status: value.status,
            reason: value.reason,
            timestamp: format_system_time(value.timestamp),
            admin: value.admin,
            previous_status: value.previous_status,
        }
    }
}

/// Team as returned to the admin, lobby and per-team pages.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamView {
    pub id: String,
    pub name: String,
    pub track: String,
    pub members: Vec<MemberView>,
    pub status: TeamStatus,
    /// Derived from `status == arrived`.
    pub checked_in: bool,
    pub arrival_timestamp: Option<String>,
    pub current_round: u8,
    pub promoted_to_round_2: bool,
    pub eliminated_round: Option<u8>,
    pub removal_reason: Option<String>,
    pub disqualification_reason: Option<String>,
    pub status_history: Vec<StatusChangeView>,
    pub submission: String,
    pub submission_timestamp: Option<String>,
    pub submission_round: Option<u8>,
    pub votes_received: u32,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TeamEntity> for TeamView {
    fn from(value: TeamEntity) -> Self {
        Self {
            checked_in: value.checked_in(),
            id: value.id,
            name: value.name,
            track: value.track,
            members: value.members.into_iter().map(Into::into).collect(),
            status: value.status,
            arrival_timestamp: format_optional(value.arrival_timestamp),
            current_round: value.current_round.number(),
            promoted_to_round_2: value.promoted_to_round_2,
            eliminated_round: value.eliminated_round.map(|round| round.number()),
            removal_reason: value.removal_reason,
            disqualification_reason: value.disqualification_reason,
            status_history: value.status_history.into_iter().map(Into::into).collect(),
            submission: value.submission,
            submission_timestamp: format_optional(value.submission_timestamp),
            submission_round: value.submission_round.map(|round| round.number()),
            votes_received: value.votes_received,
            version: value.version,
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Number of teams per status, over the whole roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub arrived: usize,
    pub removed: usize,
    pub disqualified: usize,
    pub eliminated: usize,
}

impl StatusCounts {
    pub fn tally<'a>(teams: impl IntoIterator<Item = &'a TeamEntity>) -> Self {
        teams.into_iter().fold(Self::default(), |mut counts, team| {
            counts.all += 1;
            match team.status {
                TeamStatus::Pending => counts.pending += 1,
                TeamStatus::Arrived => counts.arrived += 1,
                TeamStatus::Removed => counts.removed += 1,
                TeamStatus::Disqualified => counts.disqualified += 1,
                TeamStatus::Eliminated => counts.eliminated += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamListResponse {
    pub teams: Vec<TeamView>,
    /// Number of teams after filtering.
    pub total: usize,
    pub by_status: StatusCounts,
}

/// Acknowledgement for commands that touch one team.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamActionResponse {
    pub team: TeamView,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionResponse {
    pub promoted_teams: Vec<TeamView>,
    pub eliminated_teams: Vec<TeamView>,
    /// Requested ids that were not arrived round 1 teams.
    pub ignored_ids: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResetResponse {
    pub teams_reset: u64,
    pub message: String,
}
