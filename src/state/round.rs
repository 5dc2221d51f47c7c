//! Round switching for the competition singleton.

use std::time::SystemTime;

use crate::dao::models::{CompetitionStateEntity, Round};

/// Switch the competition to `round`.
///
/// Entering round 2 stamps `round_2_start_time`, and `round_1_end_time` when
/// round 1 was never closed explicitly. Both milestones are first-write-wins.
pub fn enter_round(state: &mut CompetitionStateEntity, round: Round, now: SystemTime) {
    state.current_round = round;
    if round == Round::Two {
        state.round_2_start_time.get_or_insert(now);
        state.round_1_end_time.get_or_insert(now);
    }
    state.updated_at = now;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    #[test]
    fn first_entry_into_round_two_stamps_both_milestones() {
        let mut state = CompetitionStateEntity::new("ignite2", 3600, at(0));
        enter_round(&mut state, Round::Two, at(10));
        assert_eq!(state.current_round, Round::Two);
        assert_eq!(state.round_1_end_time, Some(at(10)));
        assert_eq!(state.round_2_start_time, Some(at(10)));

        enter_round(&mut state, Round::Two, at(20));
        assert_eq!(state.round_1_end_time, Some(at(10)));
        assert_eq!(state.round_2_start_time, Some(at(10)));
    }

    #[test]
    fn going_back_to_round_one_keeps_milestones() {
        let mut state = CompetitionStateEntity::new("ignite2", 3600, at(0));
        enter_round(&mut state, Round::Two, at(10));
        enter_round(&mut state, Round::One, at(30));
        assert_eq!(state.current_round, Round::One);
        assert_eq!(state.round_2_start_time, Some(at(10)));

        enter_round(&mut state, Round::Two, at(50));
        assert_eq!(state.round_2_start_time, Some(at(10)));
    }

    #[test]
    fn explicit_round_one_close_is_preserved() {
        let mut state = CompetitionStateEntity::new("ignite2", 3600, at(0));
        state.round_1_end_time = Some(at(5));
        enter_round(&mut state, Round::Two, at(10));
        assert_eq!(state.round_1_end_time, Some(at(5)));
        assert_eq!(state.round_2_start_time, Some(at(10)));
    }

    #[test]
    fn round_one_does_not_stamp_anything() {
        let mut state = CompetitionStateEntity::new("ignite2", 3600, at(0));
        enter_round(&mut state, Round::One, at(10));
        assert_eq!(state.round_1_end_time, None);
        assert_eq!(state.round_2_start_time, None);
        assert_eq!(state.updated_at, at(10));
    }
}
