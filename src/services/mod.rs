/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Round 1 to round 2 promotion.
pub mod promotion_service;
/// Global lobby reset.
pub mod reset_service;
/// Round, timer and lobby display commands.
pub mod round_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming.
pub mod sse_service;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
/// Team registration, status changes, check-in and submissions.
pub mod team_service;
