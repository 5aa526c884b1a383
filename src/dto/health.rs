use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Rooms currently held by the store.
    pub rooms: usize,
}

impl HealthResponse {
    /// The store answered its health check.
    pub fn ok(rooms: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
        }
    }

    /// The store failed its health check.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
            rooms: 0,
        }
    }
}
