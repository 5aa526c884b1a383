/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Generated menu suggestions.
pub mod menu_service;
/// Nearby place search.
pub mod places_service;
/// Room allocation, listing and raw path access.
pub mod room_service;
/// Server-Sent Events streaming of room changes.
pub mod sse_service;
/// Errors and request helpers for outbound providers.
pub mod upstream;
/// WebSocket connection and message handling service.
pub mod websocket_service;
