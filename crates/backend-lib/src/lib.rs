// ============================
// gamenight-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the gamenight lobby and voting server.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod friends;
pub mod handlers;
pub mod lobby;
pub mod metrics;
pub mod router;
pub mod storage;
pub mod sweeper;
pub mod validation;
pub mod vote;

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::catalog::{GameCatalog, RawgCatalog};
use crate::config::Settings;
use crate::error::AppError;
use crate::friends::FriendGraph;
use crate::lobby::LobbyRegistry;
use crate::storage::Storage;
use crate::vote::VoteRegistry;

pub use router::create_router;
pub use sweeper::spawn_sweeper;

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Durable user directory, friend edges and favorites
    pub storage: S,
    /// Bearer token sessions
    pub sessions: SessionManager,
    pub lobbies: LobbyRegistry,
    pub votes: VoteRegistry,
    /// External game catalog
    pub catalog: Arc<dyn GameCatalog>,
    pub settings: Arc<Settings>,
}

impl<S: Storage + Clone + 'static> AppState<S> {
    /// Create a new application state
    pub fn new(storage: S, settings: Settings, catalog: Arc<dyn GameCatalog>) -> Self {
        let friends: Arc<dyn FriendGraph> = Arc::new(storage.clone());

        Self {
            sessions: SessionManager::new(settings.session_ttl()),
            lobbies: LobbyRegistry::new(friends),
            votes: VoteRegistry::new(),
            catalog,
            settings: Arc::new(settings),
            storage,
        }
    }

    /// Application state backed by the configured RAWG catalog
    pub fn with_rawg_catalog(storage: S, settings: Settings) -> Result<Self, AppError> {
        let catalog = RawgCatalog::new(&settings.catalog)?;
        Ok(Self::new(storage, settings, Arc::new(catalog)))
    }
}
