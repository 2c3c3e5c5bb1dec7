//! Game search and favorites.
use std::collections::HashSet;
use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use futures_util::future::join_all;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::catalog::{lookup_bounded, GameInfo};
use crate::error::AppError;
use crate::storage::Storage;
use crate::validation::{self, parse_body};
use crate::AppState;

fn with_favorited(game: &GameInfo, favorited: bool) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(game)?;
    value["favorited"] = json!(favorited);
    Ok(value)
}

/// `POST /search`: catalog search, flagging the caller's favorites
pub async fn search_games<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let request = validation::game_search(&body)?;

    let games = state.catalog.search(&request.search, request.page).await?;
    let favorites: HashSet<_> = state
        .storage
        .favorite_games(&user.user_id)
        .await?
        .into_iter()
        .collect();

    let results = games
        .iter()
        .map(|g| with_favorited(g, favorites.contains(&g.id)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(json!({ "results": results })))
}

/// `POST /addToFavourites`: toggles the favorite flag
pub async fn add_to_favourites<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let game_id = validation::favorite_game(&body)?;

    let favorited = state.storage.toggle_favorite(&user.user_id, game_id).await?;
    let message = if favorited {
        "Game added to favourites"
    } else {
        "Game removed from favourites"
    };

    Ok(Json(json!({
        "success": message,
        "favorited": favorited,
    })))
}

/// `POST /getUserFavourites`: favorites of the caller or of `user_id`.
///
/// Games the catalog cannot describe in time are left out.
pub async fn get_user_favourites<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let request = validation::user_favorites(&body)?;
    let owner = request.user_id.unwrap_or(user.user_id);
    let needle = request.search.trim().to_lowercase();

    let ids = state.storage.favorite_games(&owner).await?;
    let limit = state.settings.catalog.timeout();
    let catalog = state.catalog.as_ref();
    let lookups = join_all(ids.iter().map(|&id| lookup_bounded(catalog, id, limit))).await;

    let games = lookups
        .iter()
        .flatten()
        .filter(|g| needle.is_empty() || g.name.to_lowercase().contains(&needle))
        .map(|g| with_favorited(g, true))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(Value::Array(games)))
}
