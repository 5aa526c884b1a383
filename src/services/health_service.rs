use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the room store and report how many rooms it holds.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store = state.store();
    if let Err(err) = store.health_check().await {
        warn!(error = %err, "storage health check failed");
        return HealthResponse::degraded();
    }

    match store.list_rooms().await {
        Ok(rooms) => HealthResponse::ok(rooms.len()),
        Err(err) => {
            warn!(error = %err, "failed to list rooms for health check");
            HealthResponse::degraded()
        }
    }
}
