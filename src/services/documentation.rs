use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Ignite back office.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::teams::list_teams,
        crate::routes::teams::get_team,
        crate::routes::teams::register_team,
        crate::routes::teams::change_status,
        crate::routes::teams::check_in,
        crate::routes::teams::promote,
        crate::routes::teams::submit,
        crate::routes::teams::reset,
        crate::routes::round::get_round_state,
        crate::routes::round::set_round,
        crate::routes::round::timer_action,
        crate::routes::round::get_display,
        crate::routes::round::set_display,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::TeamRegisteredEvent,
            crate::dto::sse::TeamStatusChangedEvent,
            crate::dto::sse::TeamsPromotedEvent,
            crate::dto::sse::CompetitionResetEvent,
            crate::dto::sse::RoundChangedEvent,
            crate::dto::sse::TimerUpdatedEvent,
            crate::dto::sse::DisplayUpdatedEvent,
            crate::dao::models::TeamStatus,
            crate::dao::models::PreviousStatus,
            crate::state::timer::TimerAction,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events change feed"),
        (name = "teams", description = "Registration, check-in, status changes, promotion and reset"),
        (name = "round", description = "Round selection, timers and the lobby display"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_api_path() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/sse/public",
            "/api/ignite2/teams",
            "/api/ignite2/teams/{id}",
            "/api/ignite2/reset",
            "/api/ignite2/round/message",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
