//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::MemoryAdapter;
use crate::config::Config;
use chapter_map_core::ports::{MapRepository, UserRepository};
use chapter_map_core::service::MapService;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub maps: MapService,
    pub users: Arc<dyn UserRepository>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        map_repo: Arc<dyn MapRepository>,
        users: Arc<dyn UserRepository>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            maps: MapService::new(map_repo),
            users,
            config,
        }
    }

    /// State backed by a single in-memory store.
    pub fn in_memory(config: Arc<Config>) -> Self {
        let store = Arc::new(MemoryAdapter::new());
        Self::new(store.clone(), store, config)
    }
}
