// ============================
// crates/backend-lib/src/handlers/lobby.rs
// ============================
//! Lobby lifecycle endpoints.
use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use gamenight_common::MemberView;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::storage::Storage;
use crate::validation::{self, parse_body};
use crate::AppState;

/// `POST /createLobby`
pub async fn create_lobby<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let body = parse_body(&body)?;
    let request = validation::create_lobby(&body, &state.settings.lobby)?;

    let lobby = state.lobbies.create(
        &request.name,
        request.visibility,
        request.max_players,
        &user.user_id,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Lobby created successfully",
            "lobby": lobby.view(),
        })),
    ))
}

/// `POST /joinLobby`
pub async fn join_lobby<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let lobby_id = validation::join_lobby(&body)?;

    let lobby = state.lobbies.join(&lobby_id, &user.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Successfully joined lobby",
        "lobby": lobby.view(),
    })))
}

/// `GET /leaveLobby`
pub async fn leave_lobby<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let outcome = state.lobbies.leave(&user.user_id)?;

    match outcome.lobby {
        Some(lobby) => Ok(Json(json!({
            "success": true,
            "message": "Successfully left lobby",
            "lobby_removed": false,
            "lobby": lobby.view(),
        }))),
        None => {
            if state.votes.remove(&outcome.lobby_id) {
                debug!(lobby_id = %outcome.lobby_id, "vote session dropped with its lobby");
            }
            Ok(Json(json!({
                "success": true,
                "message": "Left lobby and it was removed as it became empty",
                "lobby_removed": true,
            })))
        },
    }
}

/// `POST /getLobbies`
pub async fn get_lobbies<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let request = validation::list_lobbies(&body)?;

    let lobbies = state
        .lobbies
        .list(&user.user_id, &request.search, request.filter)
        .await?;
    let views: Vec<_> = lobbies.iter().map(|l| l.view()).collect();

    Ok(Json(json!({
        "success": true,
        "lobbies": views,
    })))
}

/// `GET /getLobbyInfo`: the caller's lobby with member names
pub async fn get_lobby_info<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let lobby = state
        .lobbies
        .lobby_for(&user.user_id)
        .ok_or(AppError::NotInLobby)?;

    let users = state.storage.get_users(lobby.members()).await?;
    let members: Vec<MemberView> = lobby
        .members()
        .iter()
        .map(|id| MemberView {
            id: id.clone(),
            name: users
                .iter()
                .find(|u| &u.id == id)
                .map(|u| u.name.clone())
                .unwrap_or_default(),
        })
        .collect();

    let mut view = serde_json::to_value(lobby.view())?;
    view["users"] = serde_json::to_value(members)?;
    view["in_lobby"] = json!(true);

    Ok(Json(json!({
        "success": true,
        "lobby": view,
    })))
}
