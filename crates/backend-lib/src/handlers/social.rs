//! Users and friendships.
use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::friends::FriendGraph;
use crate::storage::Storage;
use crate::validation::{self, parse_body};
use crate::AppState;

/// `POST /register`: create a user and issue a bearer token
pub async fn register<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let body = parse_body(&body)?;
    let request = validation::register(&body)?;

    let user = state.storage.create_user(&request.name, &request.email).await?;
    let token = state.sessions.new_session(&user.id).await;
    info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "user": user,
            "token": token,
        })),
    ))
}

/// `GET /user`
pub async fn current_user<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let user = state
        .storage
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::Auth("User no longer exists".to_string()))?;
    Ok(Json(serde_json::to_value(user)?))
}

/// `POST /logout`
pub async fn logout<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Json<Value> {
    state.sessions.revoke(&user.token).await;
    Json(json!({ "success": "Logged out" }))
}

/// `POST /addFriend`
pub async fn add_friend<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let friend_id = validation::friend_user(&body)?;

    let edge = state
        .storage
        .create_friend_request(&user.user_id, &friend_id)
        .await?;

    Ok(Json(json!({
        "success": "Friend request sent",
        "request": edge,
    })))
}

/// `POST /acceptFriend`
pub async fn accept_friend<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let edge_id = validation::friend_edge(&body)?;

    state
        .storage
        .accept_friend_request(edge_id, &user.user_id)
        .await?;

    Ok(Json(json!({ "success": "Friend request accepted" })))
}

/// `POST /removeFriend`
pub async fn remove_friend<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let edge_id = validation::friend_edge(&body)?;

    state
        .storage
        .remove_friend_edge(edge_id, &user.user_id)
        .await?;

    Ok(Json(json!({ "success": "Friend removed" })))
}

/// `POST /getFriends`: accepted friendships, optionally filtered by name
pub async fn get_friends<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let needle = validation::search_term(&body)?.trim().to_lowercase();

    let edges: Vec<_> = state
        .storage
        .friend_edges(&user.user_id)
        .await?
        .into_iter()
        .filter(|e| e.accepted)
        .collect();
    let others: Vec<_> = edges
        .iter()
        .filter_map(|e| e.other(&user.user_id).cloned())
        .collect();
    let users = state.storage.get_users(&others).await?;

    let friends: Vec<Value> = edges
        .iter()
        .filter_map(|edge| {
            let friend_id = edge.other(&user.user_id)?;
            let name = users
                .iter()
                .find(|u| &u.id == friend_id)
                .map(|u| u.name.as_str())
                .unwrap_or_default();
            if !needle.is_empty() && !name.to_lowercase().contains(&needle) {
                return None;
            }
            Some(json!({
                "id": edge.id,
                "friend_id": friend_id,
                "name": name,
                "sender_id": edge.sender_id,
                "receiver_id": edge.receiver_id,
                "accepted": edge.accepted,
            }))
        })
        .collect();

    Ok(Json(Value::Array(friends)))
}

/// `GET /getPending`: requests waiting for the caller's answer
pub async fn get_pending<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let pending = state.storage.pending_for(&user.user_id).await?;
    let senders: Vec<_> = pending.iter().map(|e| e.sender_id.clone()).collect();
    let users = state.storage.get_users(&senders).await?;

    let requests: Vec<Value> = pending
        .iter()
        .map(|edge| {
            let name = users
                .iter()
                .find(|u| u.id == edge.sender_id)
                .map(|u| u.name.as_str())
                .unwrap_or_default();
            json!({
                "id": edge.id,
                "sender_id": edge.sender_id,
                "sender_name": name,
                "created_at": edge.created_at,
            })
        })
        .collect();

    Ok(Json(Value::Array(requests)))
}
