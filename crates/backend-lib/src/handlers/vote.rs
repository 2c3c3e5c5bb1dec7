//! Voting endpoints.
use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use gamenight_common::VoteResultsView;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::lobby::Lobby;
use crate::storage::Storage;
use crate::validation::{self, parse_body};
use crate::vote::{collect_candidates, SessionHandle};
use crate::AppState;

fn not_in_lobby() -> AppError {
    AppError::BadRequest("You are not in any lobby".to_string())
}

/// Session for `lobby`, built from its members' favorites on first use
async fn session_for<S: Storage + Clone + 'static>(
    state: &AppState<S>,
    lobby: &Lobby,
) -> Result<Option<SessionHandle>, AppError> {
    let limit = state.settings.catalog.timeout();
    state
        .votes
        .get_or_create(&state.lobbies, lobby, || {
            collect_candidates(lobby.members(), &state.storage, state.catalog.as_ref(), limit)
        })
        .await
}

/// The caller's lobby and its vote session; `missing` when voting has not begun
async fn current_session<S: Storage + Clone + 'static>(
    state: &AppState<S>,
    user: &AuthUser,
    missing: AppError,
) -> Result<(Lobby, SessionHandle), AppError> {
    let lobby = state
        .lobbies
        .lobby_for(&user.user_id)
        .ok_or_else(not_in_lobby)?;
    let handle = session_for(state, &lobby).await?.ok_or(missing)?;
    Ok((lobby, handle))
}

/// `POST /startVoting`
pub async fn start_voting<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let lobby = state
        .lobbies
        .lobby_for(&user.user_id)
        .ok_or_else(not_in_lobby)?;
    let lobby = state.lobbies.start_voting(lobby.id(), &user.user_id)?;

    // The lobby is already voting; a failed build is retried by the next vote call
    if let Err(err) = session_for(&state, &lobby).await {
        warn!(lobby_id = %lobby.id(), error = %err, "could not prepare vote session");
    }

    Ok(Json(json!({
        "success": true,
        "message": "Voting started successfully",
    })))
}

/// `POST /postVote`
pub async fn post_vote<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let request = validation::post_vote(&body)?;
    let (lobby, handle) = current_session(&state, &user, AppError::VotingNotStarted).await?;

    let tally = {
        let mut session = handle.lock();
        let already_voted = session
            .ballot(&user.user_id, request.game_id)
            .is_some_and(|cell| cell != 0);
        if already_voted && !state.settings.voting.allow_revote {
            return Err(AppError::AlreadyVoted);
        }
        session.cast_vote(request.game_id, &user.user_id, request.vote)?
    };

    info!(
        lobby_id = %lobby.id(),
        user = %user.user_id,
        game_id = tally.id,
        vote = request.vote.value(),
        "vote cast"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Vote recorded successfully",
        "game_id": tally.id,
        "game_name": tally.name,
        "user_vote": request.vote.value(),
        "new_total_votes": tally.votes,
        "new_upvotes": tally.upvotes,
        "new_downvotes": tally.downvotes,
    })))
}

/// Serialized directly so `players_favorite_games` keeps member order
#[derive(Serialize)]
pub struct VoteResultResponse {
    success: bool,
    #[serde(flatten)]
    view: VoteResultsView,
}

/// `GET /voteResult`: tallies sorted by net votes
pub async fn vote_result<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<VoteResultResponse>, AppError> {
    let (lobby, handle) = current_session(&state, &user, AppError::NoVoteSession).await?;

    let (results, upvotes) = {
        let session = handle.lock();
        (session.results(), session.voted_games(lobby.members()))
    };

    let mut games = results.games;
    games.sort_by(|a, b| b.votes.cmp(&a.votes));

    let view = VoteResultsView {
        lobby_id: lobby.id().to_string(),
        games,
        players_favorite_games: upvotes,
        total_votes_cast: results.total_votes_cast,
        total_players: lobby.member_count(),
        player_votes: results.player_votes,
    };

    Ok(Json(VoteResultResponse {
        success: true,
        view,
    }))
}

/// `GET /getVoteGames`: the candidate list
pub async fn get_vote_games<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let (_lobby, handle) = current_session(&state, &user, AppError::VotingNotStarted).await?;
    let games = handle.lock().summaries();

    Ok(Json(json!({
        "success": true,
        "games": games,
    })))
}
