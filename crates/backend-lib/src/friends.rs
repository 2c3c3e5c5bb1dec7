//! Friendship queries over stored friend request edges.
//!
//! Edges are directed (sender → receiver); friendship is symmetric and
//! exists once either direction is accepted.
use std::collections::HashSet;

use async_trait::async_trait;
use gamenight_common::UserId;

use crate::error::AppError;
use crate::storage::{FriendEdge, Storage};

#[async_trait]
pub trait FriendGraph: Send + Sync {
    /// Accepted friends of `user`, either direction
    async fn friends_of(&self, user: &str) -> Result<HashSet<UserId>, AppError>;

    /// Unaccepted requests addressed to `user`
    async fn pending_for(&self, user: &str) -> Result<Vec<FriendEdge>, AppError>;

    async fn are_friends(&self, a: &str, b: &str) -> Result<bool, AppError> {
        Ok(self.friends_of(a).await?.contains(b))
    }
}

#[async_trait]
impl<S: Storage + ?Sized> FriendGraph for S {
    async fn friends_of(&self, user: &str) -> Result<HashSet<UserId>, AppError> {
        Ok(self
            .friend_edges(user)
            .await?
            .iter()
            .filter(|e| e.accepted)
            .filter_map(|e| e.other(user).cloned())
            .collect())
    }

    async fn pending_for(&self, user: &str) -> Result<Vec<FriendEdge>, AppError> {
        Ok(self
            .friend_edges(user)
            .await?
            .into_iter()
            .filter(|e| !e.accepted && e.receiver_id == user)
            .collect())
    }
}
