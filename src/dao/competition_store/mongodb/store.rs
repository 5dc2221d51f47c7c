use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoCompetitionDocument, MongoTeamDocument},
};
use crate::dao::{
    competition_store::{CompetitionStore, TeamQuery},
    models::{CompetitionStateEntity, TeamEntity},
    storage::StorageResult,
};

const TEAM_COLLECTION_NAME: &str = "teams";
const COMPETITION_COLLECTION_NAME: &str = "competition_states";
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoCompetitionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}

fn version_filter(key_field: &str, key: &str, expected_version: u64) -> Document {
    doc! {
        key_field: key,
        "version": i64::try_from(expected_version).unwrap_or(i64::MAX),
    }
}

fn team_filter(query: &TeamQuery) -> Document {
    let mut filter = Document::new();
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }
    if let Some(round) = query.current_round {
        filter.insert("current_round", i32::from(round.number()));
    }
    filter
}

impl MongoCompetitionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let teams = self.team_collection().await;
        let unique_id = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("team_id_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        teams
            .create_index(unique_id)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TEAM_COLLECTION_NAME,
                index: "id",
                source,
            })?;

        let pool = IndexModel::builder()
            .keys(doc! { "status": 1, "current_round": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("team_status_round_idx".to_owned()))
                    .build(),
            )
            .build();
        teams
            .create_index(pool)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TEAM_COLLECTION_NAME,
                index: "status,current_round",
                source,
            })?;

        let competitions = self.competition_collection().await;
        let unique_event = IndexModel::builder()
            .keys(doc! { "event_id": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("competition_event_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        competitions
            .create_index(unique_event)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: COMPETITION_COLLECTION_NAME,
                index: "event_id",
                source,
            })?;

        Ok(())
    }

    async fn team_collection(&self) -> Collection<MongoTeamDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoTeamDocument>(TEAM_COLLECTION_NAME)
    }

    async fn competition_collection(&self) -> Collection<MongoCompetitionDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoCompetitionDocument>(COMPETITION_COLLECTION_NAME)
    }

    async fn find_team(&self, id: String) -> StorageResult<Option<TeamEntity>> {
        let collection = self.team_collection().await;
        let document = collection
            .find_one(doc! { "id": &id })
            .await
            .map_err(|source| MongoDaoError::LoadTeam {
                id: id.clone(),
                source,
            })?;

        document.map(TeamEntity::try_from).transpose()
    }

    async fn find_teams(&self, query: TeamQuery) -> StorageResult<Vec<TeamEntity>> {
        let collection = self.team_collection().await;
        let documents: Vec<MongoTeamDocument> = collection
            .find(team_filter(&query))
            .sort(doc! { "id": 1 })
            .await
            .map_err(|source| MongoDaoError::ListTeams { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListTeams { source })?;

        documents.into_iter().map(TeamEntity::try_from).collect()
    }

    async fn count_teams(&self) -> StorageResult<u64> {
        let collection = self.team_collection().await;
        let count = collection
            .count_documents(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListTeams { source })?;
        Ok(count)
    }

    async fn insert_team(&self, team: TeamEntity) -> StorageResult<bool> {
        let id = team.id.clone();
        let document: MongoTeamDocument = team.into();
        let collection = self.team_collection().await;
        match collection.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => {
                debug!(team_id = %id, "team id already taken");
                Ok(false)
            }
            Err(source) => Err(MongoDaoError::SaveTeam { id, source }.into()),
        }
    }

    async fn replace_team(&self, team: TeamEntity, expected_version: u64) -> StorageResult<bool> {
        let id = team.id.clone();
        let document: MongoTeamDocument = team.into();
        let collection = self.team_collection().await;
        let result = collection
            .replace_one(version_filter("id", &id, expected_version), &document)
            .await
            .map_err(|source| MongoDaoError::SaveTeam { id, source })?;
        Ok(result.matched_count == 1)
    }

    async fn find_competition(
        &self,
        event_id: String,
    ) -> StorageResult<Option<CompetitionStateEntity>> {
        let collection = self.competition_collection().await;
        let document = collection
            .find_one(doc! { "event_id": &event_id })
            .await
            .map_err(|source| MongoDaoError::LoadCompetition {
                event_id: event_id.clone(),
                source,
            })?;

        document.map(CompetitionStateEntity::try_from).transpose()
    }

    async fn insert_competition(&self, state: CompetitionStateEntity) -> StorageResult<bool> {
        let event_id = state.event_id.clone();
        let document: MongoCompetitionDocument = state.into();
        let collection = self.competition_collection().await;
        match collection.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::SaveCompetition { event_id, source }.into()),
        }
    }

    async fn replace_competition(
        &self,
        state: CompetitionStateEntity,
        expected_version: u64,
    ) -> StorageResult<bool> {
        let event_id = state.event_id.clone();
        let document: MongoCompetitionDocument = state.into();
        let collection = self.competition_collection().await;
        let result = collection
            .replace_one(
                version_filter("event_id", &event_id, expected_version),
                &document,
            )
            .await
            .map_err(|source| MongoDaoError::SaveCompetition { event_id, source })?;
        Ok(result.matched_count == 1)
    }
}

impl CompetitionStore for MongoCompetitionStore {
    fn find_team(&self, id: String) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_team(id).await })
    }

    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_teams(TeamQuery::default()).await })
    }

    fn find_teams(&self, query: TeamQuery) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_teams(query).await })
    }

    fn count_teams(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_teams().await })
    }

    fn insert_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_team(team).await })
    }

    fn replace_team(
        &self,
        team: TeamEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.replace_team(team, expected_version).await })
    }

    fn find_competition(
        &self,
        event_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<CompetitionStateEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_competition(event_id).await })
    }

    fn insert_competition(
        &self,
        state: CompetitionStateEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_competition(state).await })
    }

    fn replace_competition(
        &self,
        state: CompetitionStateEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.replace_competition(state, expected_version).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.reconnect().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::TeamStatus;

    #[test]
    fn promotion_pool_filter_targets_status_and_round() {
        let filter = team_filter(&TeamQuery::promotion_pool());
        assert_eq!(filter.get_str("status").unwrap(), "arrived");
        assert_eq!(filter.get_i32("current_round").unwrap(), 1);
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(team_filter(&TeamQuery::default()).is_empty());
        let filter = team_filter(&TeamQuery {
            status: Some(TeamStatus::Eliminated),
            current_round: None,
        });
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get_str("status").unwrap(), "eliminated");
    }

    #[test]
    fn version_filter_pins_expected_version() {
        let filter = version_filter("id", "team-004", 7);
        assert_eq!(filter.get_str("id").unwrap(), "team-004");
        assert_eq!(filter.get_i64("version").unwrap(), 7);
    }
}
