//! Test utilities for the HTTP surface.
//!
//! Builds an application over a temporary data directory and a stub game
//! catalog, then drives the router with `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use gamenight_backend_lib::{
    catalog::{CatalogError, GameCatalog, GameInfo},
    config::Settings,
    create_router,
    storage::FlatFileStorage,
    AppState,
};
use gamenight_common::GameId;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Catalog answering from a fixed table; unknown ids fail like a 404
#[derive(Default)]
pub struct StubCatalog {
    games: HashMap<GameId, GameInfo>,
    search_fails: bool,
}

impl StubCatalog {
    pub fn with_games(games: &[(GameId, &str)]) -> Self {
        let games = games
            .iter()
            .map(|&(id, name)| {
                let info = GameInfo {
                    id,
                    name: name.to_string(),
                    background_image: Some(format!("https://img.example/{id}.jpg")),
                    released: None,
                    rating: None,
                };
                (id, info)
            })
            .collect();
        Self {
            games,
            search_fails: false,
        }
    }

    pub fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }
}

#[async_trait]
impl GameCatalog for StubCatalog {
    async fn game(&self, id: GameId) -> Result<GameInfo, CatalogError> {
        self.games.get(&id).cloned().ok_or(CatalogError::Status(404))
    }

    async fn search(&self, query: &str, _page: u32) -> Result<Vec<GameInfo>, CatalogError> {
        if self.search_fails {
            return Err(CatalogError::Timeout);
        }
        let query = query.to_lowercase();
        let mut found: Vec<_> = self
            .games
            .values()
            .filter(|g| g.name.to_lowercase().contains(&query))
            .cloned()
            .collect();
        found.sort_by_key(|g| g.id);
        Ok(found)
    }
}

/// A running application plus the directory backing it
pub struct TestApp {
    pub state: Arc<AppState<FlatFileStorage>>,
    pub router: Router,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_catalog(StubCatalog::with_games(&[
            (42, "Trivia Pursuit"),
            (3498, "Grand Theft Auto V"),
            (4200, "Portal 2"),
        ]))
    }

    pub fn with_catalog(catalog: StubCatalog) -> Self {
        Self::with_settings_and_catalog(Settings::default(), catalog)
    }

    pub fn with_settings_and_catalog(mut settings: Settings, catalog: StubCatalog) -> Self {
        let temp_dir = TempDir::new().unwrap();
        settings.data_dir = temp_dir.path().to_path_buf();
        let storage = FlatFileStorage::new(temp_dir.path()).unwrap();

        let state = Arc::new(AppState::new(storage, settings, Arc::new(catalog)));
        let router = create_router(state.clone());

        Self {
            state,
            router,
            _temp_dir: temp_dir,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Bytes) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            },
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes)
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, path, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// GET returning the raw body, for assertions on key order
    pub async fn get_text(&self, path: &str, token: &str) -> (StatusCode, String) {
        let (status, bytes) = self.send(Method::GET, path, Some(token), None).await;
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, Some(token), None).await
    }

    /// Register a user; returns `(user_id, token)`
    pub async fn register(&self, name: &str) -> (String, String) {
        let email = format!("{}@example.com", name.to_lowercase());
        let (status, body) = self
            .request(
                Method::POST,
                "/register",
                None,
                Some(json!({ "name": name, "email": email })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Friend request from the `a_token` user to `b_id`, accepted by `b_token`
    pub async fn befriend(&self, a_token: &str, b_id: &str, b_token: &str) {
        let (status, body) = self
            .post("/addFriend", a_token, json!({ "friend_id": b_id }))
            .await;
        assert_eq!(status, StatusCode::OK, "addFriend failed: {body}");
        let edge_id = body["request"]["id"].as_u64().unwrap();

        let (status, body) = self
            .post("/acceptFriend", b_token, json!({ "friend_id": edge_id }))
            .await;
        assert_eq!(status, StatusCode::OK, "acceptFriend failed: {body}");
    }

    pub async fn create_lobby(&self, token: &str, name: &str, filter: &str, max: u64) -> String {
        let (status, body) = self
            .post(
                "/createLobby",
                token,
                json!({ "name": name, "filter": filter, "max_players": max }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "createLobby failed: {body}");
        body["lobby"]["id"].as_str().unwrap().to_string()
    }
}
