pub mod promotion;
pub mod reset;
pub mod round;
mod sse;
pub mod status;
pub mod timer;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{
    Mutex, MutexGuard, OwnedMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, watch,
};

use crate::{config::AppConfig, dao::competition_store::CompetitionStore, error::ServiceError};

pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

/// Central application state holding the storage handle, locks and broadcast hub.
pub struct AppState {
    store: RwLock<Option<Arc<dyn CompetitionStore>>>,
    config: Arc<AppConfig>,
    sse: SseHub,
    degraded: watch::Sender<bool>,
    team_locks: DashMap<String, Arc<Mutex<()>>>,
    competition_gate: Mutex<()>,
    registration_gate: Mutex<()>,
    bulk_gate: RwLock<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            sse: SseHub::new(config.sse_capacity),
            config: Arc::new(config),
            degraded: degraded_tx,
            team_locks: DashMap::new(),
            competition_gate: Mutex::new(()),
            registration_gate: Mutex::new(()),
            bulk_gate: RwLock::new(()),
        })
    }

    /// Build a state with `store` already installed.
    pub async fn with_store(config: AppConfig, store: Arc<dyn CompetitionStore>) -> SharedState {
        let state = Self::new(config);
        state.set_store(store).await;
        state
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn CompetitionStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Store handle, or [`ServiceError::Degraded`] while none is installed
    /// or the supervisor reported it unhealthy.
    pub async fn require_store(&self) -> Result<Arc<dyn CompetitionStore>, ServiceError> {
        if *self.degraded.borrow() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn CompetitionStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let installed = self.store.read().await.is_some();
        !installed || *self.degraded.borrow()
    }

    /// Broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Serialise writers of one team inside this process.
    ///
    /// The per-team mutex is dropped from the map once its last holder or
    /// waiter lets go, so unknown ids leave nothing behind.
    pub async fn lock_team(&self, team_id: &str) -> TeamLock<'_> {
        let lock = self
            .team_locks
            .entry(team_id.to_owned())
            .or_default()
            .clone();
        TeamLock {
            locks: &self.team_locks,
            team_id: team_id.to_owned(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub(crate) fn team_lock_count(&self) -> usize {
        self.team_locks.len()
    }

    /// Serialise writers of the competition singleton.
    pub async fn lock_competition(&self) -> MutexGuard<'_, ()> {
        self.competition_gate.lock().await
    }

    /// Serialise registrations so duplicate-name checks and id allocation see each other.
    pub async fn lock_registration(&self) -> MutexGuard<'_, ()> {
        self.registration_gate.lock().await
    }

    /// Shared side of the bulk gate, held by single-team writers.
    pub async fn enter_single(&self) -> RwLockReadGuard<'_, ()> {
        self.bulk_gate.read().await
    }

    /// Exclusive side of the bulk gate, held by promote and reset.
    pub async fn enter_bulk(&self) -> RwLockWriteGuard<'_, ()> {
        self.bulk_gate.write().await
    }
}

/// Held lock on one team; see [`AppState::lock_team`].
pub struct TeamLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    team_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TeamLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters clone the Arc under the shard lock, so a count of one means
        // only the map still refers to this mutex.
        self.locks
            .remove_if(&self.team_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::competition_store::MemoryStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state.set_store(Arc::new(MemoryStore::new())).await;
        assert!(!state.is_degraded().await);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_store().await.is_ok());

        state.update_degraded(true).await;
        assert!(state.require_store().await.is_err());

        state.clear_store().await;
        assert!(state.store().await.is_none());
    }

    #[tokio::test]
    async fn team_locks_are_per_team() {
        let state = AppState::new(AppConfig::default());
        let _alpha = state.lock_team("team-001").await;
        // A different team is not blocked.
        let _beta = state.lock_team("team-002").await;
        assert!(state.team_locks.get("team-001").unwrap().try_lock().is_err());
        assert!(state.team_locks.get("team-003").is_none());
    }

    #[tokio::test]
    async fn team_locks_are_pruned_after_release() {
        let state = AppState::new(AppConfig::default());
        for i in 0..100 {
            let _ghost = state.lock_team(&format!("ghost-{i}")).await;
        }
        assert_eq!(state.team_lock_count(), 0);

        let first = state.lock_team("team-001").await;
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move {
                let _second = state.lock_team("team-001").await;
                state.team_lock_count()
            })
        };
        tokio::task::yield_now().await;
        drop(first);
        // The waiter still held a clone, so the entry survived the first release.
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(state.team_lock_count(), 0);
    }
}
