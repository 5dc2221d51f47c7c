//! In-process store used by tests and by `STORE_BACKEND=memory` deployments.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{self, BoxFuture};

use super::{CompetitionStore, TeamQuery};
use crate::dao::{
    models::{CompetitionStateEntity, TeamEntity},
    storage::StorageResult,
};

#[derive(Clone, Default)]
pub struct MemoryStore {
    teams: Arc<DashMap<String, TeamEntity>>,
    competitions: Arc<DashMap<String, CompetitionStateEntity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn scan(&self, query: &TeamQuery) -> Vec<TeamEntity> {
        let mut teams: Vec<TeamEntity> = self
            .teams
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        teams.sort_by(|a, b| a.id.cmp(&b.id));
        teams
    }
}

impl CompetitionStore for MemoryStore {
    fn find_team(&self, id: String) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let team = self.teams.get(&id).map(|entry| entry.value().clone());
        Box::pin(future::ready(Ok(team)))
    }

    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let teams = self.scan(&TeamQuery::default());
        Box::pin(future::ready(Ok(teams)))
    }

    fn find_teams(&self, query: TeamQuery) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let teams = self.scan(&query);
        Box::pin(future::ready(Ok(teams)))
    }

    fn count_teams(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let count = self.teams.len() as u64;
        Box::pin(future::ready(Ok(count)))
    }

    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let inserted = match self.teams.entry(team.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(team);
                true
            }
        };
        Box::pin(future::ready(Ok(inserted)))
    }

    fn replace_team(
        &self,
        team: TeamEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let swapped = match self.teams.entry(team.id.clone()) {
            Entry::Occupied(mut occupied) if occupied.get().version == expected_version => {
                occupied.insert(team);
                true
            }
            _ => false,
        };
        Box::pin(future::ready(Ok(swapped)))
    }

    fn find_competition(
        &self,
        event_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<CompetitionStateEntity>>> {
        let state = self
            .competitions
            .get(&event_id)
            .map(|entry| entry.value().clone());
        Box::pin(future::ready(Ok(state)))
    }

    fn insert_competition(
        &self,
        state: CompetitionStateEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inserted = match self.competitions.entry(state.event_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(state);
                true
            }
        };
        Box::pin(future::ready(Ok(inserted)))
    }

    fn replace_competition(
        &self,
        state: CompetitionStateEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let swapped = match self.competitions.entry(state.event_id.clone()) {
            Entry::Occupied(mut occupied) if occupied.get().version == expected_version => {
                occupied.insert(state);
                true
            }
            _ => false,
        };
        Box::pin(future::ready(Ok(swapped)))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{Round, TeamStatus};
    use crate::test_support::team;

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let store = MemoryStore::new();
        assert!(store.insert_team(team("team-001", "Alpha")).await.unwrap());
        assert!(!store.insert_team(team("team-001", "Other")).await.unwrap());
        assert_eq!(store.count_teams().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replace_requires_matching_version() {
        let store = MemoryStore::new();
        store.insert_team(team("team-001", "Alpha")).await.unwrap();

        let mut updated = team("team-001", "Alpha");
        updated.status = TeamStatus::Arrived;
        updated.version = 1;
        assert!(!store.replace_team(updated.clone(), 3).await.unwrap());
        assert!(store.replace_team(updated.clone(), 0).await.unwrap());
        // Same expected version again is now stale.
        assert!(!store.replace_team(updated, 0).await.unwrap());

        let stored = store.find_team("team-001".into()).await.unwrap().unwrap();
        assert_eq!(stored.status, TeamStatus::Arrived);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn replace_of_missing_team_is_rejected() {
        let store = MemoryStore::new();
        assert!(!store.replace_team(team("ghost", "Ghost"), 0).await.unwrap());
    }

    #[tokio::test]
    async fn find_teams_applies_query_and_orders_by_id() {
        let store = MemoryStore::new();
        let mut b = team("team-002", "Beta");
        b.status = TeamStatus::Arrived;
        let mut c = team("team-003", "Gamma");
        c.status = TeamStatus::Arrived;
        c.current_round = Round::Two;
        let mut a = team("team-001", "Alpha");
        a.status = TeamStatus::Arrived;
        for t in [b, c, a] {
            store.insert_team(t).await.unwrap();
        }

        let pool = store.find_teams(TeamQuery::promotion_pool()).await.unwrap();
        let ids: Vec<_> = pool.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["team-001", "team-002"]);
    }

    #[tokio::test]
    async fn competition_singleton_is_inserted_once() {
        let store = MemoryStore::new();
        let state = CompetitionStateEntity::new("ignite2", 3600, SystemTime::now());
        assert!(store.insert_competition(state.clone()).await.unwrap());
        assert!(!store.insert_competition(state).await.unwrap());
        assert!(store
            .find_competition("ignite2".into())
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_competition("other".into())
            .await
            .unwrap()
            .is_none());
    }
}
