use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::dao::{
    models::{
        CompetitionStateEntity, MemberEntity, PixelDisplayEntity, PreviousStatus, Round,
        StatusChangeEntity, TeamEntity, TeamStatus, TimerEntity,
    },
    storage::{StorageError, StorageResult},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    id: String,
    name: String,
    track: String,
    #[serde(default)]
    members: Vec<MemberEntity>,
    status: TeamStatus,
    arrival_timestamp: Option<DateTime>,
    current_round: i32,
    #[serde(default)]
    promoted_to_round_2: bool,
    eliminated_round: Option<i32>,
    removal_reason: Option<String>,
    disqualification_reason: Option<String>,
    #[serde(default)]
    status_history: Vec<MongoStatusChange>,
    #[serde(default)]
    submission: String,
    submission_timestamp: Option<DateTime>,
    submission_round: Option<i32>,
    #[serde(default)]
    votes_received: i64,
    #[serde(default)]
    version: i64,
    created_at: DateTime,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoStatusChange {
    status: TeamStatus,
    reason: String,
    timestamp: DateTime,
    admin: String,
    previous_status: PreviousStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCompetitionDocument {
    event_id: String,
    current_round: i32,
    round_1_timer: MongoTimer,
    round_2_timer: MongoTimer,
    round_1_end_time: Option<DateTime>,
    round_2_start_time: Option<DateTime>,
    #[serde(rename = "pixelDisplay", default)]
    pixel_display: MongoPixelDisplay,
    #[serde(default)]
    version: i64,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoTimer {
    duration: i64,
    remaining: i64,
    is_running: bool,
    started_at: Option<DateTime>,
    paused_at: Option<DateTime>,
    end_time: Option<DateTime>,
    #[serde(rename = "lastReset", default)]
    last_reset: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MongoPixelDisplay {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    payload: String,
    #[serde(default)]
    timestamp: i64,
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(key: &str, field: &str, value: i64) -> StorageResult<u64> {
    u64::try_from(value)
        .map_err(|_| StorageError::corrupted(key, format!("negative `{field}`: {value}")))
}

fn round_from(key: &str, field: &str, value: i32) -> StorageResult<Round> {
    Round::try_from(i64::from(value))
        .map_err(|err| StorageError::corrupted(key, format!("`{field}`: {err}")))
}

fn date(value: std::time::SystemTime) -> DateTime {
    DateTime::from_system_time(value)
}

impl From<TeamEntity> for MongoTeamDocument {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            track: value.track,
            members: value.members,
            status: value.status,
            arrival_timestamp: value.arrival_timestamp.map(date),
            current_round: i32::from(value.current_round.number()),
            promoted_to_round_2: value.promoted_to_round_2,
            eliminated_round: value.eliminated_round.map(|r| i32::from(r.number())),
            removal_reason: value.removal_reason,
            disqualification_reason: value.disqualification_reason,
            status_history: value
                .status_history
                .into_iter()
                .map(|entry| MongoStatusChange {
                    status: entry.status,
                    reason: entry.reason,
                    timestamp: date(entry.timestamp),
                    admin: entry.admin,
                    previous_status: entry.previous_status,
                })
                .collect(),
            submission: value.submission,
            submission_timestamp: value.submission_timestamp.map(date),
            submission_round: value.submission_round.map(|r| i32::from(r.number())),
            votes_received: i64::from(value.votes_received),
            version: to_i64(value.version),
            created_at: date(value.created_at),
            updated_at: date(value.updated_at),
        }
    }
}

impl TryFrom<MongoTeamDocument> for TeamEntity {
    type Error = StorageError;

    fn try_from(value: MongoTeamDocument) -> Result<Self, Self::Error> {
        let key = value.id.clone();
        let votes_received = u32::try_from(value.votes_received).map_err(|_| {
            StorageError::corrupted(&key, format!("`votes_received`: {}", value.votes_received))
        })?;

        Ok(Self {
            current_round: round_from(&key, "current_round", value.current_round)?,
            eliminated_round: value
                .eliminated_round
                .map(|r| round_from(&key, "eliminated_round", r))
                .transpose()?,
            submission_round: value
                .submission_round
                .map(|r| round_from(&key, "submission_round", r))
                .transpose()?,
            version: to_u64(&key, "version", value.version)?,
            votes_received,
            id: value.id,
            name: value.name,
            track: value.track,
            members: value.members,
            status: value.status,
            arrival_timestamp: value.arrival_timestamp.map(DateTime::to_system_time),
            promoted_to_round_2: value.promoted_to_round_2,
            removal_reason: value.removal_reason,
            disqualification_reason: value.disqualification_reason,
            status_history: value
                .status_history
                .into_iter()
                .map(|entry| StatusChangeEntity {
                    status: entry.status,
                    reason: entry.reason,
                    timestamp: entry.timestamp.to_system_time(),
                    admin: entry.admin,
                    previous_status: entry.previous_status,
                })
                .collect(),
            submission: value.submission,
            submission_timestamp: value.submission_timestamp.map(DateTime::to_system_time),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

impl From<TimerEntity> for MongoTimer {
    fn from(value: TimerEntity) -> Self {
        Self {
            duration: to_i64(value.duration),
            remaining: to_i64(value.remaining),
            is_running: value.is_running,
            started_at: value.started_at.map(date),
            paused_at: value.paused_at.map(date),
            end_time: value.end_time.map(date),
            last_reset: to_i64(value.last_reset),
        }
    }
}

impl MongoTimer {
    fn into_entity(self, key: &str) -> StorageResult<TimerEntity> {
        Ok(TimerEntity {
            duration: to_u64(key, "timer.duration", self.duration)?,
            remaining: to_u64(key, "timer.remaining", self.remaining)?,
            is_running: self.is_running,
            started_at: self.started_at.map(DateTime::to_system_time),
            paused_at: self.paused_at.map(DateTime::to_system_time),
            end_time: self.end_time.map(DateTime::to_system_time),
            last_reset: to_u64(key, "timer.lastReset", self.last_reset)?,
        })
    }
}

impl From<CompetitionStateEntity> for MongoCompetitionDocument {
    fn from(value: CompetitionStateEntity) -> Self {
        Self {
            event_id: value.event_id,
            current_round: i32::from(value.current_round.number()),
            round_1_timer: value.round_1_timer.into(),
            round_2_timer: value.round_2_timer.into(),
            round_1_end_time: value.round_1_end_time.map(date),
            round_2_start_time: value.round_2_start_time.map(date),
            pixel_display: MongoPixelDisplay {
                kind: value.pixel_display.kind,
                payload: value.pixel_display.payload,
                timestamp: to_i64(value.pixel_display.timestamp),
            },
            version: to_i64(value.version),
            updated_at: date(value.updated_at),
        }
    }
}

impl TryFrom<MongoCompetitionDocument> for CompetitionStateEntity {
    type Error = StorageError;

    fn try_from(value: MongoCompetitionDocument) -> Result<Self, Self::Error> {
        let key = value.event_id.clone();
        let kind = if value.pixel_display.kind.is_empty() {
            PixelDisplayEntity::default().kind
        } else {
            value.pixel_display.kind
        };

        Ok(Self {
            current_round: round_from(&key, "current_round", value.current_round)?,
            round_1_timer: value.round_1_timer.into_entity(&key)?,
            round_2_timer: value.round_2_timer.into_entity(&key)?,
            round_1_end_time: value.round_1_end_time.map(DateTime::to_system_time),
            round_2_start_time: value.round_2_start_time.map(DateTime::to_system_time),
            pixel_display: PixelDisplayEntity {
                kind,
                payload: value.pixel_display.payload,
                timestamp: to_u64(&key, "pixelDisplay.timestamp", value.pixel_display.timestamp)?,
            },
            version: to_u64(&key, "version", value.version)?,
            updated_at: value.updated_at.to_system_time(),
            event_id: value.event_id,
        })
    }
}
