/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Public service for read-only session information.
pub mod public_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
