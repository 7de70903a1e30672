use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the live quiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_leaderboard,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::public::LeaderboardResponse,
            crate::dto::public::LeaderboardEntry,
            crate::dto::ws::ParticipantInboundMessage,
            crate::dto::ws::AnswerPayload,
            crate::dto::ws::ParticipantOutboundMessage,
            crate::dto::ws::QuestionEvent,
            crate::dto::ws::ScoreEvent,
            crate::dto::ws::FinishedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only session projections"),
        (name = "participants", description = "WebSocket operations for quiz participants"),
    )
)]
pub struct ApiDoc;
