// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request body validation.
//!
//! Bodies are parsed into a JSON object first and checked field by field so a
//! single response can report every problem. Messages follow the
//! `The <field> field ...` wording clients already display.

use std::sync::LazyLock;

use gamenight_common::{GameId, ListFilter, UserId, Visibility};
use regex::Regex;
use serde_json::{Map, Value};

use crate::config::LobbySettings;
use crate::error::{AppError, FieldErrors};
use crate::vote::Vote;

// Common validation constants
const MAX_STRING_LENGTH: usize = 255;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// A parsed request body
pub type Body = Map<String, Value>;

/// Parse a request body; an empty body counts as `{}`
pub fn parse_body(bytes: &[u8]) -> Result<Body, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Body::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(AppError::invalid(
            "body",
            "The request body must be a JSON object.",
        )),
    }
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Collects field errors while extracting values
struct Validator<'a> {
    body: &'a Body,
    errors: FieldErrors,
}

impl<'a> Validator<'a> {
    fn new(body: &'a Body) -> Self {
        Self {
            body,
            errors: FieldErrors::new(),
        }
    }

    fn fail(&mut self, field: &str, message: String) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message);
    }

    /// Present and not null
    fn present(&self, field: &str) -> Option<&'a Value> {
        let body: &'a Body = self.body;
        body.get(field).filter(|v| !v.is_null())
    }

    fn string(&mut self, field: &str, required: bool, max_len: usize) -> Option<String> {
        let Some(value) = self.present(field) else {
            if required {
                self.fail(field, format!("The {} field is required.", label(field)));
            }
            return None;
        };
        let Some(text) = value.as_str() else {
            self.fail(field, format!("The {} field must be a string.", label(field)));
            return None;
        };
        if required && text.trim().is_empty() {
            self.fail(field, format!("The {} field is required.", label(field)));
            return None;
        }
        if text.chars().count() > max_len {
            self.fail(
                field,
                format!(
                    "The {} field must not be greater than {max_len} characters.",
                    label(field)
                ),
            );
            return None;
        }
        Some(text.to_string())
    }

    fn required_string(&mut self, field: &str, max_len: usize) -> Option<String> {
        self.string(field, true, max_len)
    }

    fn optional_string(&mut self, field: &str, max_len: usize) -> Option<String> {
        self.string(field, false, max_len)
    }

    /// Integers may arrive as JSON numbers or numeric strings
    fn integer(&mut self, field: &str, required: bool) -> Option<i64> {
        let Some(value) = self.present(field) else {
            if required {
                self.fail(field, format!("The {} field is required.", label(field)));
            }
            return None;
        };
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.fail(field, format!("The {} field must be an integer.", label(field)));
        }
        parsed
    }

    fn required_integer(&mut self, field: &str) -> Option<i64> {
        self.integer(field, true)
    }

    fn optional_integer(&mut self, field: &str) -> Option<i64> {
        self.integer(field, false)
    }

    /// Integer within `[min, max]`
    fn bounded(&mut self, field: &str, value: Option<i64>, min: i64, max: i64) -> Option<i64> {
        let value = value?;
        if value < min {
            self.fail(
                field,
                format!("The {} field must be at least {min}.", label(field)),
            );
            return None;
        }
        if value > max {
            self.fail(
                field,
                format!("The {} field must not be greater than {max}.", label(field)),
            );
            return None;
        }
        Some(value)
    }

    fn choice<T: std::str::FromStr>(&mut self, field: &str, value: Option<String>) -> Option<T> {
        let value = value?;
        match value.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.fail(field, format!("The selected {} is invalid.", label(field)));
                None
            },
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, AppError> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(AppError::Validation(self.errors)),
        }
    }
}

/// Validated `POST /register`
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
}

pub fn register(body: &Body) -> Result<RegisterRequest, AppError> {
    let mut v = Validator::new(body);
    let name = v.required_string("name", MAX_STRING_LENGTH);
    let email = v
        .required_string("email", MAX_EMAIL_LENGTH)
        .and_then(|email| {
            let email = email.trim().to_string();
            if EMAIL_REGEX.is_match(&email) {
                Some(email)
            } else {
                v.fail("email", "The email field must be a valid email address.".to_string());
                None
            }
        });

    let request = match (name, email) {
        (Some(name), Some(email)) => Some(RegisterRequest {
            name: name.trim().to_string(),
            email,
        }),
        _ => None,
    };
    v.finish(request)
}

/// Validated `POST /createLobby`
#[derive(Debug, Clone, PartialEq)]
pub struct CreateLobbyRequest {
    pub name: String,
    pub visibility: Visibility,
    pub max_players: usize,
}

pub fn create_lobby(body: &Body, limits: &LobbySettings) -> Result<CreateLobbyRequest, AppError> {
    let mut v = Validator::new(body);
    let name = v.required_string("name", limits.max_name_len);
    let filter = v.required_string("filter", MAX_STRING_LENGTH);
    let visibility = v.choice::<Visibility>("filter", filter);
    let max_players = v.required_integer("max_players");
    let max_players = v.bounded(
        "max_players",
        max_players,
        limits.min_players as i64,
        limits.max_players as i64,
    );

    let request = match (name, visibility, max_players) {
        (Some(name), Some(visibility), Some(max_players)) => Some(CreateLobbyRequest {
            name: name.trim().to_string(),
            visibility,
            max_players: max_players as usize,
        }),
        _ => None,
    };
    v.finish(request)
}

/// `POST /joinLobby`: the lobby id
pub fn join_lobby(body: &Body) -> Result<String, AppError> {
    let mut v = Validator::new(body);
    let lobby_id = v.required_string("lobby_id", MAX_STRING_LENGTH);
    v.finish(lobby_id)
}

/// Validated `POST /getLobbies`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListLobbiesRequest {
    pub search: String,
    pub filter: ListFilter,
}

pub fn list_lobbies(body: &Body) -> Result<ListLobbiesRequest, AppError> {
    let mut v = Validator::new(body);
    let search = v.optional_string("search", MAX_STRING_LENGTH);
    let filter = v.optional_string("filter", MAX_STRING_LENGTH);
    let filter = match filter {
        Some(raw) => v.choice::<ListFilter>("filter", Some(raw)),
        None => Some(ListFilter::All),
    };

    let request = filter.map(|filter| ListLobbiesRequest {
        search: search.unwrap_or_default(),
        filter,
    });
    v.finish(request)
}

/// Validated `POST /postVote`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostVoteRequest {
    pub game_id: GameId,
    pub vote: Vote,
}

pub fn post_vote(body: &Body) -> Result<PostVoteRequest, AppError> {
    let mut v = Validator::new(body);
    let game_id = game_id(&mut v);
    let vote = v.required_integer("vote").and_then(|raw| match Vote::try_from(raw) {
        Ok(vote) => Some(vote),
        Err(_) => {
            v.fail("vote", "The selected vote is invalid.".to_string());
            None
        },
    });

    let request = match (game_id, vote) {
        (Some(game_id), Some(vote)) => Some(PostVoteRequest { game_id, vote }),
        _ => None,
    };
    v.finish(request)
}

fn game_id(v: &mut Validator<'_>) -> Option<GameId> {
    let raw = v.required_integer("game_id");
    v.bounded("game_id", raw, 1, i64::MAX).map(|id| id as GameId)
}

/// `POST /addToFavourites`: the game id
pub fn favorite_game(body: &Body) -> Result<GameId, AppError> {
    let mut v = Validator::new(body);
    let game_id = game_id(&mut v);
    v.finish(game_id)
}

/// `POST /addFriend`: the user to send a request to
pub fn friend_user(body: &Body) -> Result<UserId, AppError> {
    let mut v = Validator::new(body);
    let friend_id = v.required_string("friend_id", MAX_STRING_LENGTH);
    v.finish(friend_id)
}

/// `POST /acceptFriend` and `POST /removeFriend`: the friend edge id
pub fn friend_edge(body: &Body) -> Result<u64, AppError> {
    let mut v = Validator::new(body);
    let raw = v.required_integer("friend_id");
    let edge = v.bounded("friend_id", raw, 1, i64::MAX).map(|id| id as u64);
    v.finish(edge)
}

/// Optional `search` term shared by listing endpoints
pub fn search_term(body: &Body) -> Result<String, AppError> {
    let mut v = Validator::new(body);
    let search = v.optional_string("search", MAX_STRING_LENGTH);
    v.finish(Some(search.unwrap_or_default()))
}

/// Validated `POST /search`
#[derive(Debug, Clone, PartialEq)]
pub struct GameSearchRequest {
    pub search: String,
    pub page: u32,
}

pub fn game_search(body: &Body) -> Result<GameSearchRequest, AppError> {
    let mut v = Validator::new(body);
    let search = v.required_string("search", MAX_STRING_LENGTH);
    let page = match v.optional_integer("page") {
        Some(raw) => v.bounded("page", Some(raw), 1, i64::from(u32::MAX)),
        None => Some(1),
    };

    let request = match (search, page) {
        (Some(search), Some(page)) => Some(GameSearchRequest {
            search: search.trim().to_string(),
            page: page as u32,
        }),
        _ => None,
    };
    v.finish(request)
}

/// Validated `POST /getUserFavourites`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FavoritesRequest {
    pub user_id: Option<UserId>,
    pub search: String,
}

pub fn user_favorites(body: &Body) -> Result<FavoritesRequest, AppError> {
    let mut v = Validator::new(body);
    let user_id = v.optional_string("user_id", MAX_STRING_LENGTH);
    let search = v.optional_string("search", MAX_STRING_LENGTH);
    v.finish(Some(FavoritesRequest {
        user_id: user_id.filter(|id| !id.trim().is_empty()),
        search: search.unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Body {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn fields(err: AppError) -> FieldErrors {
        match err {
            AppError::Validation(fields) => fields,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_body() {
        assert!(parse_body(b"").unwrap().is_empty());
        assert!(parse_body(b"  \n").unwrap().is_empty());
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap()["a"], json!(1));

        assert!(matches!(parse_body(b"[1,2]"), Err(AppError::Validation(_))));
        assert!(matches!(parse_body(b"{not json"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_lobby() {
        let limits = LobbySettings::default();

        let request = create_lobby(
            &body(json!({"name": " Catan Night ", "filter": "friends", "max_players": "6"})),
            &limits,
        )
        .unwrap();
        assert_eq!(request.name, "Catan Night");
        assert_eq!(request.visibility, Visibility::FriendsOnly);
        assert_eq!(request.max_players, 6);

        let errors = fields(create_lobby(&body(json!({})), &limits).unwrap_err());
        assert_eq!(
            errors.keys().collect::<Vec<_>>(),
            vec!["filter", "max_players", "name"]
        );

        let errors = fields(
            create_lobby(
                &body(json!({"name": "a".repeat(51), "filter": "secret", "max_players": 1})),
                &limits,
            )
            .unwrap_err(),
        );
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["filter"], vec!["The selected filter is invalid."]);
        assert_eq!(errors["max_players"], vec!["The max players field must be at least 2."]);

        let errors = fields(
            create_lobby(
                &body(json!({"name": "Big", "filter": "public", "max_players": 25})),
                &limits,
            )
            .unwrap_err(),
        );
        assert!(errors.contains_key("max_players"));
    }

    #[test]
    fn test_join_lobby() {
        assert_eq!(
            join_lobby(&body(json!({"lobby_id": "lobby_1"}))).unwrap(),
            "lobby_1"
        );
        let errors = fields(join_lobby(&body(json!({"lobby_id": 5}))).unwrap_err());
        assert_eq!(errors["lobby_id"], vec!["The lobby id field must be a string."]);
    }

    #[test]
    fn test_list_lobbies() {
        assert_eq!(list_lobbies(&Body::new()).unwrap(), ListLobbiesRequest::default());

        let request = list_lobbies(&body(json!({"search": "cat", "filter": "friends"}))).unwrap();
        assert_eq!(request.search, "cat");
        assert_eq!(request.filter, ListFilter::Friends);

        let errors = fields(
            list_lobbies(&body(json!({"search": "x".repeat(256), "filter": "mine"}))).unwrap_err(),
        );
        assert!(errors.contains_key("search"));
        assert!(errors.contains_key("filter"));
    }

    #[test]
    fn test_post_vote() {
        let request = post_vote(&body(json!({"game_id": 3498, "vote": -1}))).unwrap();
        assert_eq!(request.game_id, 3498);
        assert_eq!(request.vote, Vote::Down);

        let errors = fields(post_vote(&body(json!({"game_id": "abc", "vote": 0}))).unwrap_err());
        assert_eq!(errors["game_id"], vec!["The game id field must be an integer."]);
        assert_eq!(errors["vote"], vec!["The selected vote is invalid."]);

        let errors = fields(post_vote(&body(json!({"vote": 1.5}))).unwrap_err());
        assert_eq!(errors["game_id"], vec!["The game id field is required."]);
        assert!(errors.contains_key("vote"));
    }

    #[test]
    fn test_register() {
        let request = register(&body(json!({"name": "Ada", "email": "ada@example.com"}))).unwrap();
        assert_eq!(request.name, "Ada");

        let errors = fields(register(&body(json!({"name": "", "email": "nope"}))).unwrap_err());
        assert!(errors.contains_key("name"));
        assert_eq!(
            errors["email"],
            vec!["The email field must be a valid email address."]
        );
    }

    #[test]
    fn test_game_search_and_friend_fields() {
        let request = game_search(&body(json!({"search": "zelda"}))).unwrap();
        assert_eq!(request.page, 1);
        assert!(game_search(&body(json!({"search": "zelda", "page": 0}))).is_err());
        assert!(game_search(&Body::new()).is_err());

        assert_eq!(friend_edge(&body(json!({"friend_id": "7"}))).unwrap(), 7);
        assert!(friend_edge(&body(json!({"friend_id": "seven"}))).is_err());
        assert_eq!(friend_user(&body(json!({"friend_id": "u-1"}))).unwrap(), "u-1");

        let request = user_favorites(&body(json!({"user_id": "", "search": "cat"}))).unwrap();
        assert_eq!(request.user_id, None);
        assert_eq!(request.search, "cat");
    }
}
