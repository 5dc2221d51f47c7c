//! Wall-clock anchored round timer.
//!
//! Nothing ticks in the background. While a timer runs its `end_time` is the
//! source of truth and the remaining time is recomputed from it on every read.

use std::{
    fmt,
    str::FromStr,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::dao::models::{TimerEntity, epoch_millis};

/// Action names accepted by the timer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    Start,
    Pause,
    Reset,
    Set,
}

impl TimerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerAction::Start => "start",
            TimerAction::Pause => "pause",
            TimerAction::Reset => "reset",
            TimerAction::Set => "set",
        }
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerAction {
    type Err = TimerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "start" => Ok(TimerAction::Start),
            "pause" => Ok(TimerAction::Pause),
            "reset" => Ok(TimerAction::Reset),
            "set" => Ok(TimerAction::Set),
            other => Err(TimerError::UnknownAction(other.to_owned())),
        }
    }
}

/// Validated timer command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Reset,
    /// Load a new duration (seconds) and stop the timer.
    Set { duration: u64 },
}

impl TimerCommand {
    /// Build a command from the raw action and optional duration.
    pub fn parse(action: TimerAction, duration: Option<i64>) -> Result<Self, TimerError> {
        match action {
            TimerAction::Start => Ok(TimerCommand::Start),
            TimerAction::Pause => Ok(TimerCommand::Pause),
            TimerAction::Reset => Ok(TimerCommand::Reset),
            TimerAction::Set => {
                let raw = duration.ok_or(TimerError::MissingDuration)?;
                let duration =
                    u64::try_from(raw).map_err(|_| TimerError::InvalidDuration(raw))?;
                Ok(TimerCommand::Set { duration })
            }
        }
    }

}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("action must be one of: start, pause, reset, set (got `{0}`)")]
    UnknownAction(String),
    #[error("duration is required for set action")]
    MissingDuration,
    #[error("duration must be a non-negative number for set action (got {0})")]
    InvalidDuration(i64),
    #[error("a {0} second run would end past 9999-12-31T23:59:59Z")]
    EndOutOfRange(u64),
}

/// 9999-12-31T23:59:59Z, the last instant an RFC 3339 timestamp can carry.
const LATEST_END: Duration = Duration::from_secs(253_402_300_799);

fn end_of_run(now: SystemTime, secs: u64) -> Result<SystemTime, TimerError> {
    now.checked_add(Duration::from_secs(secs))
        .filter(|end| {
            end.duration_since(SystemTime::UNIX_EPOCH)
                .is_ok_and(|since_epoch| since_epoch <= LATEST_END)
        })
        .ok_or(TimerError::EndOutOfRange(secs))
}

/// Seconds left on `timer` at `now`.
pub fn remaining_at(timer: &TimerEntity, now: SystemTime) -> u64 {
    match (timer.is_running, timer.end_time) {
        (true, Some(end)) => end
            .duration_since(now)
            .map(|left| left.as_secs())
            .unwrap_or(0),
        _ => timer.remaining,
    }
}

/// A timer that was started at some point and has run out.
pub fn has_expired(timer: &TimerEntity, now: SystemTime) -> bool {
    timer.started_at.is_some() && remaining_at(timer, now) == 0
}

/// Apply `command` to `timer`. Every accepted command refreshes
/// `last_reset`, even when it turns out to be a no-op.
///
/// A start whose end would not fit in a timestamp is refused and leaves the
/// timer untouched.
pub fn apply(
    timer: &mut TimerEntity,
    command: TimerCommand,
    now: SystemTime,
) -> Result<(), TimerError> {
    match command {
        TimerCommand::Start => {
            if !timer.is_running {
                let time_to_run = if timer.remaining > 0 {
                    timer.remaining
                } else {
                    timer.duration
                };
                let end = end_of_run(now, time_to_run)?;
                timer.is_running = true;
                timer.started_at = Some(now);
                timer.paused_at = None;
                timer.end_time = Some(end);
            }
        }
        TimerCommand::Pause => {
            if timer.is_running {
                timer.remaining = remaining_at(timer, now);
                timer.is_running = false;
                timer.paused_at = Some(now);
                timer.end_time = None;
            }
        }
        TimerCommand::Reset => stop(timer),
        TimerCommand::Set { duration } => {
            timer.duration = duration;
            stop(timer);
        }
    }
    timer.last_reset = epoch_millis(now);
    Ok(())
}

fn stop(timer: &mut TimerEntity) {
    timer.remaining = timer.duration;
    timer.is_running = false;
    timer.started_at = None;
    timer.paused_at = None;
    timer.end_time = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn after(secs: u64) -> SystemTime {
        t0() + Duration::from_secs(secs)
    }

    fn assert_running_iff_end_time(timer: &TimerEntity) {
        assert_eq!(timer.is_running, timer.end_time.is_some());
    }

    #[test]
    fn pause_captures_wall_clock_remaining_and_start_resumes() {
        let mut timer = TimerEntity::stopped(3600);
        apply(&mut timer, TimerCommand::Start, t0()).unwrap();
        assert_eq!(timer.end_time, Some(after(3600)));

        apply(&mut timer, TimerCommand::Pause, after(1000)).unwrap();
        assert_eq!(timer.remaining, 2600);
        assert!(!timer.is_running);
        assert_eq!(timer.end_time, None);
        assert_eq!(timer.paused_at, Some(after(1000)));

        apply(&mut timer, TimerCommand::Start, after(1000)).unwrap();
        assert_eq!(timer.end_time, Some(after(3600)));
        assert_eq!(timer.paused_at, None);
    }

    #[test]
    fn remaining_is_derived_from_end_time_while_running() {
        let mut timer = TimerEntity::stopped(60);
        apply(&mut timer, TimerCommand::Start, t0()).unwrap();
        assert_eq!(remaining_at(&timer, after(15)), 45);
        assert_eq!(remaining_at(&timer, t0() + Duration::from_millis(59_500)), 0);
        assert_eq!(remaining_at(&timer, after(600)), 0);
        // The stored counter is not trusted while running.
        assert_eq!(timer.remaining, 60);
    }

    #[test]
    fn start_while_running_only_touches_last_reset() {
        let mut timer = TimerEntity::stopped(60);
        apply(&mut timer, TimerCommand::Start, t0()).unwrap();
        let before = timer.clone();

        apply(&mut timer, TimerCommand::Start, after(10)).unwrap();
        assert_eq!(timer.end_time, before.end_time);
        assert_eq!(timer.started_at, before.started_at);
        assert_eq!(timer.last_reset, epoch_millis(after(10)));
    }

    #[test]
    fn pause_when_stopped_is_a_noop() {
        let mut timer = TimerEntity::stopped(60);
        apply(&mut timer, TimerCommand::Pause, after(3)).unwrap();
        assert_eq!(timer.remaining, 60);
        assert_eq!(timer.paused_at, None);
        assert_eq!(timer.last_reset, epoch_millis(after(3)));
    }

    #[test]
    fn start_after_expiry_restarts_from_duration() {
        let mut timer = TimerEntity::stopped(60);
        apply(&mut timer, TimerCommand::Start, t0()).unwrap();
        apply(&mut timer, TimerCommand::Pause, after(90)).unwrap();
        assert_eq!(timer.remaining, 0);

        apply(&mut timer, TimerCommand::Start, after(100)).unwrap();
        assert_eq!(timer.end_time, Some(after(160)));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut timer = TimerEntity::stopped(300);
        apply(&mut timer, TimerCommand::Start, t0()).unwrap();
        apply(&mut timer, TimerCommand::Reset, after(5)).unwrap();
        let once = timer.clone();
        apply(&mut timer, TimerCommand::Reset, after(5)).unwrap();
        assert_eq!(timer, once);
        assert_eq!(timer.remaining, 300);
        assert_eq!(timer.started_at, None);
    }

    #[test]
    fn set_loads_duration_and_stops() {
        let mut timer = TimerEntity::stopped(300);
        apply(&mut timer, TimerCommand::Start, t0()).unwrap();
        apply(&mut timer, TimerCommand::Set { duration: 900 }, after(1)).unwrap();
        assert_eq!(timer.duration, 900);
        assert_eq!(timer.remaining, 900);
        assert!(!timer.is_running);
        assert_eq!(timer.started_at, None);
    }

    #[test]
    fn running_iff_end_time_for_every_action_sequence() {
        let commands = [
            TimerCommand::Start,
            TimerCommand::Pause,
            TimerCommand::Reset,
            TimerCommand::Set { duration: 10 },
        ];
        for first in commands {
            for second in commands {
                for third in commands {
                    let mut timer = TimerEntity::stopped(120);
                    for (i, command) in [first, second, third].into_iter().enumerate() {
                        apply(&mut timer, command, after(i as u64 * 7)).unwrap();
                        assert_running_iff_end_time(&timer);
                    }
                }
            }
        }
    }

    #[test]
    fn expiry_requires_a_started_timer() {
        let mut timer = TimerEntity::stopped(0);
        assert!(!has_expired(&timer, t0()));

        timer = TimerEntity::stopped(30);
        apply(&mut timer, TimerCommand::Start, t0()).unwrap();
        assert!(!has_expired(&timer, after(29)));
        assert!(has_expired(&timer, after(30)));
    }

    #[test]
    fn start_refuses_an_end_beyond_the_timestamp_range() {
        let mut timer = TimerEntity::stopped(60);
        apply(&mut timer, TimerCommand::Set { duration: u64::MAX }, t0()).unwrap();
        let before = timer.clone();
        assert_eq!(
            apply(&mut timer, TimerCommand::Start, after(1)),
            Err(TimerError::EndOutOfRange(u64::MAX))
        );
        assert_eq!(timer, before);

        apply(&mut timer, TimerCommand::Set { duration: 300_000_000_000 }, t0()).unwrap();
        assert_eq!(
            apply(&mut timer, TimerCommand::Start, t0()),
            Err(TimerError::EndOutOfRange(300_000_000_000))
        );
        assert!(!timer.is_running);

        let fits = LATEST_END.as_secs() - 1_700_000_000;
        apply(&mut timer, TimerCommand::Set { duration: fits }, t0()).unwrap();
        apply(&mut timer, TimerCommand::Start, t0()).unwrap();
        assert_eq!(timer.end_time, Some(SystemTime::UNIX_EPOCH + LATEST_END));
    }

    #[test]
    fn parse_validates_action_and_duration() {
        assert_eq!("pause".parse::<TimerAction>(), Ok(TimerAction::Pause));
        assert!(matches!(
            "stop".parse::<TimerAction>(),
            Err(TimerError::UnknownAction(a)) if a == "stop"
        ));
        assert_eq!(
            TimerCommand::parse(TimerAction::Set, Some(0)),
            Ok(TimerCommand::Set { duration: 0 })
        );
        assert_eq!(
            TimerCommand::parse(TimerAction::Set, Some(-5)),
            Err(TimerError::InvalidDuration(-5))
        );
        assert_eq!(
            TimerCommand::parse(TimerAction::Set, None),
            Err(TimerError::MissingDuration)
        );
        assert_eq!(
            TimerCommand::parse(TimerAction::Start, Some(-5)),
            Ok(TimerCommand::Start)
        );
    }
}
