// ============================
// gamenight-backend-lib/src/storage.rs
// ============================
//! Storage abstraction with flat-file implementation.
//!
//! Holds the durable side of the system: the user directory, friend
//! request edges and favorited games. Lobbies and votes never touch it.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gamenight_common::{GameId, UserId};
use serde::{Deserialize, Serialize};
use tokio::{fs as tokio_fs, sync::Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

const RECORDS_FILE: &str = "records.json";

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A friend request from `sender_id` to `receiver_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendEdge {
    pub id: u64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

impl FriendEdge {
    /// The user on the other end of the edge, if `user` is on it at all
    pub fn other(&self, user: &str) -> Option<&UserId> {
        if self.sender_id == user {
            Some(&self.receiver_id)
        } else if self.receiver_id == user {
            Some(&self.sender_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Favorite {
    user_id: UserId,
    game_id: GameId,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Records {
    users: Vec<User>,
    friend_edges: Vec<FriendEdge>,
    next_edge_id: u64,
    favorites: Vec<Favorite>,
}

/// Trait for storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Register a user; emails are unique ignoring case
    async fn create_user(&self, name: &str, email: &str) -> Result<User, AppError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Users for `ids` in the same order, unknown ids skipped
    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<User>, AppError>;

    /// Record an unaccepted friend request
    async fn create_friend_request(
        &self,
        sender: &str,
        receiver: &str,
    ) -> Result<FriendEdge, AppError>;

    /// Accept a request addressed to `receiver`
    async fn accept_friend_request(
        &self,
        edge_id: u64,
        receiver: &str,
    ) -> Result<FriendEdge, AppError>;

    /// Delete an edge `user` is part of
    async fn remove_friend_edge(&self, edge_id: u64, user: &str) -> Result<(), AppError>;

    /// Every edge touching `user`, accepted or not
    async fn friend_edges(&self, user: &str) -> Result<Vec<FriendEdge>, AppError>;

    /// Flip the favorite flag; returns whether the game is now a favorite
    async fn toggle_favorite(&self, user: &str, game_id: GameId) -> Result<bool, AppError>;

    /// Favorited games in the order they were added
    async fn favorite_games(&self, user: &str) -> Result<Vec<GameId>, AppError>;
}

/// Flat-file implementation of the Storage trait.
///
/// Records live in memory and a JSON snapshot is rewritten after every
/// mutation.
#[derive(Clone)]
pub struct FlatFileStorage {
    root: PathBuf,
    records: Arc<Mutex<Records>>,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let path = root.join(RECORDS_FILE);
        let records = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            Records::default()
        };

        Ok(Self {
            root,
            records: Arc::new(Mutex::new(records)),
        })
    }

    async fn persist(&self, records: &Records) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.root.join(format!("{RECORDS_FILE}.tmp"));
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, self.root.join(RECORDS_FILE)).await?;
        debug!(root = %self.root.display(), "records persisted");
        Ok(())
    }
}

#[async_trait]
impl Storage for FlatFileStorage {
    async fn create_user(&self, name: &str, email: &str) -> Result<User, AppError> {
        let mut records = self.records.lock().await;
        if records
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(AppError::DuplicateEmail);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        records.users.push(user.clone());
        self.persist(&records).await?;

        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let records = self.records.lock().await;
        Ok(records.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<User>, AppError> {
        let records = self.records.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| records.users.iter().find(|u| &u.id == id).cloned())
            .collect())
    }

    async fn create_friend_request(
        &self,
        sender: &str,
        receiver: &str,
    ) -> Result<FriendEdge, AppError> {
        let mut records = self.records.lock().await;
        if !records.users.iter().any(|u| u.id == receiver) {
            return Err(AppError::invalid(
                "friend_id",
                "The selected friend id is invalid.",
            ));
        }
        if records
            .friend_edges
            .iter()
            .any(|e| e.sender_id == sender && e.receiver_id == receiver)
        {
            return Err(AppError::BadRequest("Friend request already sent".to_string()));
        }
        if sender == receiver {
            return Err(AppError::BadRequest("You can't be your own friend".to_string()));
        }

        records.next_edge_id += 1;
        let edge = FriendEdge {
            id: records.next_edge_id,
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            accepted: false,
            created_at: Utc::now(),
        };
        records.friend_edges.push(edge.clone());
        self.persist(&records).await?;

        Ok(edge)
    }

    async fn accept_friend_request(
        &self,
        edge_id: u64,
        receiver: &str,
    ) -> Result<FriendEdge, AppError> {
        let mut records = self.records.lock().await;
        let edge = records
            .friend_edges
            .iter_mut()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

        if edge.accepted {
            return Err(AppError::BadRequest(
                "You already accepted this friend request".to_string(),
            ));
        }
        if edge.receiver_id != receiver {
            return Err(AppError::BadRequest(
                "You can't accept this friend request".to_string(),
            ));
        }

        edge.accepted = true;
        let edge = edge.clone();
        self.persist(&records).await?;

        Ok(edge)
    }

    async fn remove_friend_edge(&self, edge_id: u64, user: &str) -> Result<(), AppError> {
        let mut records = self.records.lock().await;
        let index = records
            .friend_edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| AppError::NotFound("Friend not found".to_string()))?;

        if records.friend_edges[index].other(user).is_none() {
            return Err(AppError::Forbidden(
                "You can't remove this friend".to_string(),
            ));
        }

        records.friend_edges.remove(index);
        self.persist(&records).await
    }

    async fn friend_edges(&self, user: &str) -> Result<Vec<FriendEdge>, AppError> {
        let records = self.records.lock().await;
        Ok(records
            .friend_edges
            .iter()
            .filter(|e| e.other(user).is_some())
            .cloned()
            .collect())
    }

    async fn toggle_favorite(&self, user: &str, game_id: GameId) -> Result<bool, AppError> {
        let mut records = self.records.lock().await;
        let existing = records
            .favorites
            .iter()
            .position(|f| f.user_id == user && f.game_id == game_id);

        let favorited = match existing {
            Some(index) => {
                records.favorites.remove(index);
                false
            },
            None => {
                records.favorites.push(Favorite {
                    user_id: user.to_string(),
                    game_id,
                });
                true
            },
        };
        self.persist(&records).await?;

        Ok(favorited)
    }

    async fn favorite_games(&self, user: &str) -> Result<Vec<GameId>, AppError> {
        let records = self.records.lock().await;
        Ok(records
            .favorites
            .iter()
            .filter(|f| f.user_id == user)
            .map(|f| f.game_id)
            .collect())
    }
}
