pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::{
    models::{CompetitionStateEntity, Round, TeamEntity, TeamStatus},
    storage::StorageResult,
};

pub use memory::MemoryStore;

/// Filter for scanning the teams collection. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamQuery {
    pub status: Option<TeamStatus>,
    pub current_round: Option<Round>,
}

impl TeamQuery {
    /// Teams eligible for promotion: arrived and still in round 1.
    pub fn promotion_pool() -> Self {
        Self {
            status: Some(TeamStatus::Arrived),
            current_round: Some(Round::One),
        }
    }

    /// Whether `team` satisfies the filter.
    pub fn matches(&self, team: &TeamEntity) -> bool {
        self.status.is_none_or(|status| team.status == status)
            && self
                .current_round
                .is_none_or(|round| team.current_round == round)
    }
}

/// Abstraction over the persistence layer for teams and the competition singleton.
///
/// Writes of existing records are compare-and-swap on `version`: the store only
/// replaces a record whose stored version equals `expected_version`, and
/// reports `false` otherwise. Callers bump the version on the entity they pass.
pub trait CompetitionStore: Send + Sync {
    fn find_team(&self, id: String) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// All teams, ordered by id.
    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Teams matching `query`, ordered by id.
    fn find_teams(&self, query: TeamQuery) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    fn count_teams(&self) -> BoxFuture<'static, StorageResult<u64>>;
    /// Insert a new team; `false` when the id is already taken.
    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<bool>>;
    fn replace_team(
        &self,
        team: TeamEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_competition(
        &self,
        event_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<CompetitionStateEntity>>>;
    /// Insert the singleton; `false` when one already exists for the event.
    fn insert_competition(
        &self,
        state: CompetitionStateEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn replace_competition(
        &self,
        state: CompetitionStateEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
