use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses(
        (
            status = 200,
            description = "Best-effort change feed",
            content_type = "text/event-stream",
            body = String
        )
    )
)]
/// Stream roster, round and timer changes to lobby screens and admin pages.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (receiver, handshake) = sse_service::subscribe_public(&state).await;
    info!(
        subscribers = state.public_sse().subscriber_count(),
        "new public SSE connection"
    );
    sse_service::to_sse_stream(receiver, handshake)
}

pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/public", get(public_stream))
}
