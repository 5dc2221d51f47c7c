use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod round;
pub mod sse;
pub mod teams;

/// Prefix shared by every command and query endpoint.
pub const API_PREFIX: &str = "/api/ignite2";

/// Compose all route trees and bind the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let api = teams::router().merge(round::router());

    Router::new()
        .nest(API_PREFIX, api)
        .merge(health::router())
        .merge(sse::router())
        .merge(docs::router())
        .with_state(state)
}
