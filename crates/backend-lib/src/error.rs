// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gamenight_common::GameId;
use thiserror::Error;
use tracing::error;

use crate::catalog::CatalogError;

/// Field-level validation failures, keyed by request field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error")]
    Validation(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lobby not found")]
    LobbyNotFound,

    #[error("Not in any lobby")]
    NotInLobby,

    #[error("You are already in a lobby")]
    AlreadyInLobby,

    #[error("A lobby with this name already exists")]
    NameTaken,

    #[error("You are already in this lobby")]
    AlreadyMember,

    #[error("Lobby is full")]
    LobbyFull,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Voting has already started")]
    AlreadyStarted,

    #[error("Voting has not started yet")]
    VotingNotStarted,

    #[error("No voting session found")]
    NoVoteSession,

    #[error("You have already voted on this game")]
    AlreadyVoted,

    #[error("Game {0} is not a candidate in this vote")]
    UnknownGame(GameId),

    #[error("User has no ballot in this vote")]
    NotABallotHolder,

    #[error("A user with this email already exists")]
    DuplicateEmail,

    #[error("{0}")]
    BadRequest(String),

    #[error("Game catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Build a validation error for a single field
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) | AppError::LobbyNotFound | AppError::NotInLobby => {
                StatusCode::NOT_FOUND
            },
            AppError::AlreadyInLobby | AppError::NameTaken | AppError::DuplicateEmail => {
                StatusCode::CONFLICT
            },
            AppError::AlreadyMember
            | AppError::LobbyFull
            | AppError::AlreadyStarted
            | AppError::VotingNotStarted
            | AppError::NoVoteSession
            | AppError::AlreadyVoted
            | AppError::UnknownGame(_)
            | AppError::NotABallotHolder
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Catalog(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) | AppError::Io(_) | AppError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "AUTH_001",
            AppError::Validation(_) => "VAL_001",
            AppError::NotFound(_) => "NF_001",
            AppError::LobbyNotFound => "LOBBY_001",
            AppError::NotInLobby => "LOBBY_002",
            AppError::AlreadyInLobby => "LOBBY_003",
            AppError::NameTaken => "LOBBY_004",
            AppError::AlreadyMember => "LOBBY_005",
            AppError::LobbyFull => "LOBBY_006",
            AppError::Forbidden(_) => "PERM_001",
            AppError::AlreadyStarted => "VOTE_001",
            AppError::VotingNotStarted => "VOTE_002",
            AppError::NoVoteSession => "VOTE_003",
            AppError::AlreadyVoted => "VOTE_004",
            AppError::UnknownGame(_) => "VOTE_005",
            AppError::NotABallotHolder => "VOTE_006",
            AppError::DuplicateEmail => "USER_001",
            AppError::BadRequest(_) => "REQ_001",
            AppError::Catalog(_) => "DEP_001",
            AppError::Internal(_) => "INT_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
        }
    }

    /// Get a message that is safe to show to clients
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(_) => "User not authenticated".to_string(),
            AppError::Catalog(_) => "Failed to get games from the game catalog".to_string(),
            AppError::Internal(_) | AppError::Io(_) | AppError::Json(_) => {
                "An internal server error occurred".to_string()
            },
            other => other.to_string(),
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if self.is_internal() {
            error!(code = error_code, error = %self, "request failed");
        }

        let mut body = serde_json::json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": self.sanitized_message(),
            }
        });
        if let AppError::Validation(fields) = &self {
            body["errors"] = serde_json::json!(fields);
        }

        (status, axum::Json(body)).into_response()
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::io::{Error as IoError, ErrorKind};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Auth("missing token".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::AlreadyInLobby.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::NameTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::LobbyFull.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::AlreadyMember.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::LobbyNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotInLobby.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Forbidden("friends only".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::AlreadyStarted.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::invalid("name", "required").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Catalog(CatalogError::Timeout).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_from_impls() {
        let io_err = IoError::new(ErrorKind::PermissionDenied, "Permission denied");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));

        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Json(_)));

        let app_err: AppError = "Str error".into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_internal_errors_are_sanitized() {
        let response = AppError::Internal("db exploded at line 42".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INT_001");
        assert_eq!(body["error"]["message"], "An internal server error occurred");
    }

    #[tokio::test]
    async fn test_validation_errors_list_fields() {
        let mut fields = FieldErrors::new();
        fields.insert("name".to_string(), vec!["The name field is required.".to_string()]);
        fields.insert("filter".to_string(), vec!["The filter is invalid.".to_string()]);
        let response = AppError::Validation(fields).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["errors"]["name"][0], "The name field is required.");
        assert!(body["errors"]["filter"].is_array());
    }
}
