//! Background eviction of stale, empty lobbies.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::lobby::LobbyRegistry;
use crate::storage::Storage;
use crate::vote::VoteRegistry;
use crate::AppState;

/// One sweep: drop stale lobbies and their vote sessions
pub fn sweep_once(
    lobbies: &LobbyRegistry,
    votes: &VoteRegistry,
    stale_after: Duration,
) -> usize {
    let removed = lobbies.sweep_stale(Utc::now(), stale_after);
    for lobby_id in &removed {
        votes.remove(lobby_id);
    }
    removed.len()
}

/// Run [`sweep_once`] every `lobby.sweep_interval_secs`
pub fn spawn_sweeper<S: Storage + Clone + 'static>(state: Arc<AppState<S>>) -> JoinHandle<()> {
    let every = state.settings.lobby.sweep_interval();
    let stale_after = state.settings.lobby.stale_after();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = sweep_once(&state.lobbies, &state.votes, stale_after);
            debug!(removed, "lobby sweep finished");
        }
    })
}
