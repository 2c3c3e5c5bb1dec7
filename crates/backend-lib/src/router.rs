// ============================
// gamenight-backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{games, lobby, social, status, vote};
use crate::storage::Storage;
use crate::AppState;

/// Create the application router
pub fn create_router<S: Storage + Clone + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/register", post(social::register::<S>))
        .route("/user", get(social::current_user::<S>))
        .route("/logout", post(social::logout::<S>))
        // Friends
        .route("/addFriend", post(social::add_friend::<S>))
        .route("/acceptFriend", post(social::accept_friend::<S>))
        .route("/removeFriend", post(social::remove_friend::<S>))
        .route("/getFriends", post(social::get_friends::<S>))
        .route("/getPending", get(social::get_pending::<S>))
        // Games
        .route("/search", post(games::search_games::<S>))
        .route("/addToFavourites", post(games::add_to_favourites::<S>))
        .route("/getUserFavourites", post(games::get_user_favourites::<S>))
        // Lobbies
        .route("/createLobby", post(lobby::create_lobby::<S>))
        .route("/joinLobby", post(lobby::join_lobby::<S>))
        .route("/leaveLobby", get(lobby::leave_lobby::<S>))
        .route("/getLobbies", post(lobby::get_lobbies::<S>))
        .route("/getLobbyInfo", get(lobby::get_lobby_info::<S>))
        // Voting
        .route("/startVoting", post(vote::start_voting::<S>))
        .route("/postVote", post(vote::post_vote::<S>))
        .route("/voteResult", get(vote::vote_result::<S>))
        .route("/getVoteGames", get(vote::get_vote_games::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
