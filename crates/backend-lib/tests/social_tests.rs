//! Users, friendships, favorites and game search over HTTP.
mod common;

use axum::http::{Method, StatusCode};
use common::{StubCatalog, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_register_and_current_user() {
    let app = TestApp::new();
    let (id, token) = app.register("Ada").await;

    let (status, body) = app.get("/user", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["email"], "ada@example.com");

    let (status, body) = app
        .request(
            Method::POST,
            "/register",
            None,
            Some(json!({ "name": "Other", "email": "ADA@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "USER_001");

    let (status, body) = app
        .request(Method::POST, "/register", None, Some(json!({ "name": "X" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array());
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new();
    let (_id, token) = app.register("Bea").await;

    let (status, _) = app.post("/logout", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/user", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_friend_request_lifecycle() {
    let app = TestApp::new();
    let (a, ta) = app.register("Cid").await;
    let (b, tb) = app.register("Dot").await;

    let (status, body) = app.post("/addFriend", &ta, json!({ "friend_id": b })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], "Friend request sent");
    let edge_id = body["request"]["id"].as_u64().unwrap();

    let (status, _) = app.post("/addFriend", &ta, json!({ "friend_id": b })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/addFriend", &ta, json!({ "friend_id": a })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/addFriend", &ta, json!({ "friend_id": "no-such-user" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app.get("/getPending", &tb).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], edge_id);
    assert_eq!(body[0]["sender_name"], "Cid");

    // Only the receiver may accept
    let (status, _) = app.post("/acceptFriend", &ta, json!({ "friend_id": edge_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/acceptFriend", &tb, json!({ "friend_id": edge_id })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.post("/getFriends", &tb, json!({})).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["friend_id"], a);
    assert_eq!(body[0]["name"], "Cid");

    let (_, body) = app.post("/getFriends", &tb, json!({ "search": "zzz" })).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = app.post("/removeFriend", &ta, json!({ "friend_id": edge_id })).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.post("/getFriends", &ta, json!({})).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = app.post("/removeFriend", &ta, json!({ "friend_id": edge_id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_friends_filter_on_lobby_listing() {
    let app = TestApp::new();
    let (_a, ta) = app.register("Eli").await;
    let (b, tb) = app.register("Fin").await;
    let (_c, tc) = app.register("Gus").await;
    app.befriend(&ta, &b, &tb).await;

    let friends_lobby = app.create_lobby(&tb, "Fin's Table", "public", 4).await;
    app.create_lobby(&tc, "Gus's Table", "public", 4).await;

    let (status, body) = app.post("/getLobbies", &ta, json!({ "filter": "friends" })).await;
    assert_eq!(status, StatusCode::OK);
    let lobbies = body["lobbies"].as_array().unwrap();
    assert_eq!(lobbies.len(), 1);
    assert_eq!(lobbies[0]["id"], friends_lobby);
}

#[tokio::test]
async fn test_favourites_toggle_and_listing() {
    let app = TestApp::new();
    let (a, ta) = app.register("Hue").await;
    let (_b, tb) = app.register("Ida").await;

    let (status, body) = app.post("/addToFavourites", &ta, json!({ "game_id": 4200 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorited"], json!(true));
    app.post("/addToFavourites", &ta, json!({ "game_id": 3498 })).await;
    // Not in the catalog; skipped when listing
    app.post("/addToFavourites", &ta, json!({ "game_id": 9 })).await;

    let (status, body) = app.post("/getUserFavourites", &ta, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Portal 2", "Grand Theft Auto V"]);
    assert_eq!(body[0]["favorited"], json!(true));

    let (_, body) = app
        .post("/getUserFavourites", &tb, json!({ "user_id": a, "search": "portal" }))
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.post("/addToFavourites", &ta, json!({ "game_id": 4200 })).await;
    assert_eq!(body["favorited"], json!(false));
    assert_eq!(body["success"], "Game removed from favourites");

    let (status, _) = app.post("/addToFavourites", &ta, json!({ "game_id": "x" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_game_search() {
    let app = TestApp::new();
    let (_a, ta) = app.register("Jay").await;
    app.post("/addToFavourites", &ta, json!({ "game_id": 4200 })).await;

    let (status, body) = app.post("/search", &ta, json!({ "search": "port" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["id"], 4200);
    assert_eq!(body["results"][0]["favorited"], json!(true));

    let (status, _) = app.post("/search", &ta, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_game_search_catalog_failure() {
    let app = TestApp::with_catalog(StubCatalog::default().failing_search());
    let (_a, ta) = app.register("Kit").await;

    let (status, body) = app.post("/search", &ta, json!({ "search": "anything" })).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "DEP_001");
}
