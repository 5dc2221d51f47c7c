use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a team during the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    /// Registered but not yet at the venue.
    Pending,
    /// Checked in and competing.
    Arrived,
    /// Removed by an admin (restorable).
    Removed,
    /// Disqualified by an admin (restorable).
    Disqualified,
    /// Not promoted or knocked out; terminal.
    Eliminated,
}

impl TeamStatus {
    /// Every status, in display order.
    pub const ALL: [TeamStatus; 5] = [
        TeamStatus::Pending,
        TeamStatus::Arrived,
        TeamStatus::Removed,
        TeamStatus::Disqualified,
        TeamStatus::Eliminated,
    ];

    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            TeamStatus::Pending => "pending",
            TeamStatus::Arrived => "arrived",
            TeamStatus::Removed => "removed",
            TeamStatus::Disqualified => "disqualified",
            TeamStatus::Eliminated => "eliminated",
        }
    }
}

impl fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a string does not name a known [`TeamStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status `{0}`; must be one of: pending, arrived, removed, disqualified, eliminated")]
pub struct UnknownStatus(pub String);

impl FromStr for TeamStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TeamStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_owned()))
    }
}

/// Status recorded as the origin of an audit entry. Besides real statuses it
/// carries the `new` (registration) and `reset` (lobby reset) markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PreviousStatus {
    New,
    Reset,
    Pending,
    Arrived,
    Removed,
    Disqualified,
    Eliminated,
}

impl From<TeamStatus> for PreviousStatus {
    fn from(value: TeamStatus) -> Self {
        match value {
            TeamStatus::Pending => PreviousStatus::Pending,
            TeamStatus::Arrived => PreviousStatus::Arrived,
            TeamStatus::Removed => PreviousStatus::Removed,
            TeamStatus::Disqualified => PreviousStatus::Disqualified,
            TeamStatus::Eliminated => PreviousStatus::Eliminated,
        }
    }
}

impl FromStr for PreviousStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(PreviousStatus::New),
            "reset" => Ok(PreviousStatus::Reset),
            other => TeamStatus::from_str(other).map(Into::into),
        }
    }
}

/// Competition round. Only two rounds exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Round {
    One,
    Two,
}

impl Round {
    /// Numeric form used on the wire and in storage.
    pub fn number(self) -> u8 {
        match self {
            Round::One => 1,
            Round::Two => 2,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Raised when a number does not name a round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("round must be 1 or 2 (got {0})")]
pub struct InvalidRound(pub i64);

impl TryFrom<i64> for Round {
    type Error = InvalidRound;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Round::One),
            2 => Ok(Round::Two),
            other => Err(InvalidRound(other)),
        }
    }
}

impl TryFrom<u8> for Round {
    type Error = InvalidRound;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Round::try_from(i64::from(value))
    }
}

impl From<Round> for u8 {
    fn from(value: Round) -> Self {
        value.number()
    }
}

/// One member of a team roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberEntity {
    pub name: String,
    /// Roll / enrollment number.
    pub roll: String,
    pub phone: String,
    pub email: String,
}

/// Append-only audit entry describing one status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChangeEntity {
    /// Status after the change.
    pub status: TeamStatus,
    pub reason: String,
    pub timestamp: SystemTime,
    /// Actor that issued the change.
    pub admin: String,
    pub previous_status: PreviousStatus,
}

/// Representation of a team stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable external identifier (`team-001`, ...).
    pub id: String,
    pub name: String,
    pub track: String,
    pub members: Vec<MemberEntity>,
    pub status: TeamStatus,
    /// Set when the team (re)enters `arrived` through check-in or a restore.
    pub arrival_timestamp: Option<SystemTime>,
    pub current_round: Round,
    pub promoted_to_round_2: bool,
    pub eliminated_round: Option<Round>,
    pub removal_reason: Option<String>,
    pub disqualification_reason: Option<String>,
    /// Full audit trail; last entry always matches `status`.
    pub status_history: Vec<StatusChangeEntity>,
    pub submission: String,
    pub submission_timestamp: Option<SystemTime>,
    pub submission_round: Option<Round>,
    pub votes_received: u32,
    /// Optimistic concurrency token, bumped on every successful write.
    pub version: u64,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl TeamEntity {
    /// Legacy flag kept for the lobby and entry pages.
    pub fn checked_in(&self) -> bool {
        self.status == TeamStatus::Arrived
    }
}

/// Countdown for one round. While running, `end_time` is the only source of
/// truth; `remaining` is meaningful only when stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerEntity {
    /// Configured length in seconds.
    pub duration: u64,
    /// Seconds left, valid while stopped.
    pub remaining: u64,
    pub is_running: bool,
    pub started_at: Option<SystemTime>,
    pub paused_at: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
    /// Epoch milliseconds of the last action of any kind; pollers use it as a change token.
    #[serde(rename = "lastReset")]
    pub last_reset: u64,
}

impl TimerEntity {
    /// A stopped timer loaded with `duration` seconds.
    pub fn stopped(duration: u64) -> Self {
        Self {
            duration,
            remaining: duration,
            is_running: false,
            started_at: None,
            paused_at: None,
            end_time: None,
            last_reset: 0,
        }
    }
}

/// Opaque blob owned by the lobby pixel display; never interpreted here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PixelDisplayEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: String,
    /// Epoch milliseconds of the last update.
    pub timestamp: u64,
}

impl Default for PixelDisplayEntity {
    fn default() -> Self {
        Self {
            kind: "text".into(),
            payload: String::new(),
            timestamp: 0,
        }
    }
}

/// Singleton record holding the round and timer state of one event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompetitionStateEntity {
    pub event_id: String,
    pub current_round: Round,
    pub round_1_timer: TimerEntity,
    pub round_2_timer: TimerEntity,
    /// First-write-wins milestone.
    pub round_1_end_time: Option<SystemTime>,
    /// First-write-wins milestone.
    pub round_2_start_time: Option<SystemTime>,
    #[serde(rename = "pixelDisplay")]
    pub pixel_display: PixelDisplayEntity,
    pub version: u64,
    pub updated_at: SystemTime,
}

impl CompetitionStateEntity {
    /// Fresh state in round 1 with both timers stopped at `timer_duration` seconds.
    pub fn new(event_id: impl Into<String>, timer_duration: u64, now: SystemTime) -> Self {
        Self {
            event_id: event_id.into(),
            current_round: Round::One,
            round_1_timer: TimerEntity::stopped(timer_duration),
            round_2_timer: TimerEntity::stopped(timer_duration),
            round_1_end_time: None,
            round_2_start_time: None,
            pixel_display: PixelDisplayEntity::default(),
            version: 0,
            updated_at: now,
        }
    }

    /// Timer belonging to `round`.
    pub fn timer(&self, round: Round) -> &TimerEntity {
        match round {
            Round::One => &self.round_1_timer,
            Round::Two => &self.round_2_timer,
        }
    }

    /// Mutable timer belonging to `round`.
    pub fn timer_mut(&mut self, round: Round) -> &mut TimerEntity {
        match round {
            Round::One => &mut self.round_1_timer,
            Round::Two => &mut self.round_2_timer,
        }
    }
}

/// Milliseconds since the Unix epoch, saturating at zero for pre-epoch clocks.
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
