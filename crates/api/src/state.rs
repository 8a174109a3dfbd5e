use std::sync::Arc;

use rbin_core::archive::ArchiveStore;
use rbin_core::coordinator::DeletionCoordinator;
use rbin_core::registry::EntityRegistry;
use rbin_core::restore::RestorationEngine;
use rbin_core::store::RowStore;
use rbin_core::sweeper::RetentionSweeper;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). The core
/// engines are constructed on demand from the shared store and registry;
/// they hold nothing but `Arc`s themselves.
#[derive(Clone)]
pub struct AppState {
    /// Row store boundary (Postgres in production, in-memory in tests).
    pub store: Arc<dyn RowStore>,
    /// Entity-type registry, built once at startup.
    pub registry: Arc<EntityRegistry>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RowStore>,
        registry: Arc<EntityRegistry>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn archive(&self) -> ArchiveStore {
        ArchiveStore::new(self.store.clone(), self.registry.clone())
    }

    pub fn coordinator(&self) -> DeletionCoordinator {
        DeletionCoordinator::new(self.store.clone(), self.registry.clone())
    }

    pub fn restoration(&self) -> RestorationEngine {
        RestorationEngine::new(self.store.clone(), self.registry.clone())
    }

    pub fn sweeper(&self) -> RetentionSweeper {
        RetentionSweeper::new(self.store.clone(), self.registry.clone())
    }
}
