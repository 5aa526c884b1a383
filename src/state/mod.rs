use std::{sync::Arc, time::Duration};

use crate::{
    config::AppConfig,
    dao::room_store::{MemoryRoomStore, RoomStore},
};

pub type SharedState = Arc<AppState>;

/// How long a WebSocket client has to send its `join` message.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout applied to outbound provider requests.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Central application state: the room store, configuration and the outbound HTTP client.
pub struct AppState {
    store: Arc<dyn RoomStore>,
    config: AppConfig,
    http: reqwest::Client,
}

impl AppState {
    /// Build the state around an in-process [`MemoryRoomStore`] sized from `config`.
    pub fn new(config: AppConfig) -> SharedState {
        let store = Arc::new(MemoryRoomStore::new(config.rooms.event_capacity));
        Self::with_store(config, store)
    }

    /// Build the state around any store implementation.
    pub fn with_store(config: AppConfig, store: Arc<dyn RoomStore>) -> SharedState {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .unwrap_or_default();
        Arc::new(Self {
            store,
            config,
            http,
        })
    }

    /// Handle to the room store.
    pub fn store(&self) -> Arc<dyn RoomStore> {
        self.store.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared client for place search and suggestion providers.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}
