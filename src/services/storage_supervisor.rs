use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{competition_store::CompetitionStore, storage::StorageError},
    services::round_service,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

/// Keep a storage connection installed in `state`, flipping degraded mode
/// while the backend is unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn CompetitionStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = backoff(delay);
                continue;
            }
        };

        if let Err(err) = round_service::ensure_initialized(store.as_ref(), state.config()).await
        {
            warn!(error = %err, "could not initialise competition state");
            sleep(delay).await;
            delay = backoff(delay);
            continue;
        }

        state.set_store(store.clone()).await;
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        monitor(&state, store.as_ref()).await;

        sleep(delay).await;
        delay = backoff(delay);
    }
}

/// Poll `store` until it fails and cannot be revived.
async fn monitor(state: &SharedState, store: &dyn CompetitionStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded().await {
                info!("storage healthy again; leaving degraded mode");
                state.update_degraded(false).await;
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        if !reconnect(state, store).await {
            warn!("exhausted storage reconnect attempts; dropping the store");
            state.clear_store().await;
            return;
        }
        state.update_degraded(false).await;
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(state: &SharedState, store: &dyn CompetitionStore) -> bool {
    let mut wait = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt,
                        error = %err,
                        "storage reconnect failed; entering degraded mode"
                    );
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(wait).await;
                wait = backoff(wait);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, dao::competition_store::MemoryStore, state::AppState};

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff(INITIAL_DELAY), Duration::from_secs(2));
        assert_eq!(backoff(Duration::from_secs(8)), MAX_DELAY);
    }

    #[tokio::test]
    async fn installs_store_and_seeds_competition() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryStore::new();
        let handle = {
            let store = store.clone();
            tokio::spawn(run(state.clone(), move || {
                let store = store.clone();
                async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn CompetitionStore>) }
            }))
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!state.is_degraded().await);
        assert!(
            store
                .find_competition("ignite2".into())
                .await
                .unwrap()
                .is_some()
        );
        handle.abort();
    }
}
