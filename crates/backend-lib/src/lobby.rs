// ============================
// gamenight-backend-lib/src/lobby.rs
// ============================
//! Lobbies and the process-wide lobby registry.
//!
//! The registry is one table behind one lock. Every mutation runs its whole
//! check-then-mutate sequence under the write lock; readers get clones. The
//! only slow dependency, the friend graph, is queried before the lock is taken.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use ::metrics::{counter, gauge};
use chrono::{DateTime, Utc};
use gamenight_common::{ListFilter, LobbyId, LobbyView, UserId, Visibility};
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::friends::FriendGraph;
use crate::metrics::{LOBBY_ACTIVE, LOBBY_CREATED, LOBBY_JOINED, LOBBY_REMOVED, LOBBY_SWEPT};

/// Smallest lobby that can hold a vote
pub const MIN_CAPACITY: usize = 2;

/// Lobby lifecycle; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyState {
    Open,
    Voting,
}

/// A single ephemeral group session
#[derive(Debug, Clone)]
pub struct Lobby {
    id: LobbyId,
    name: String,
    visibility: Visibility,
    capacity: usize,
    creator_id: UserId,
    members: Vec<UserId>,
    state: LobbyState,
    /// Creator's friends, captured on the first join that needs them
    friend_snapshot: Option<Arc<HashSet<UserId>>>,
    created_at: DateTime<Utc>,
}

impl Lobby {
    /// New open lobby with the creator as its first member
    pub fn new(name: &str, visibility: Visibility, capacity: usize, creator: &str) -> Self {
        Self {
            id: format!("lobby_{}", Uuid::new_v4().simple()),
            name: name.to_string(),
            visibility,
            capacity,
            creator_id: creator.to_string(),
            members: vec![creator.to_string()],
            state: LobbyState::Open,
            friend_snapshot: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    /// Members in join order
    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, user: &str) -> bool {
        self.members.iter().any(|m| m == user)
    }

    pub fn state(&self) -> LobbyState {
        self.state
    }

    pub fn is_voting(&self) -> bool {
        self.state == LobbyState::Voting
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    fn needs_friend_snapshot(&self, user: &str) -> bool {
        self.visibility == Visibility::FriendsOnly
            && user != self.creator_id
            && self.friend_snapshot.is_none()
    }

    /// Keeps the first snapshot; later ones are dropped
    fn install_friend_snapshot(&mut self, friends: HashSet<UserId>) {
        if self.friend_snapshot.is_none() {
            self.friend_snapshot = Some(Arc::new(friends));
        }
    }

    /// Capacity and visibility checks for a user who is not yet a member
    fn admit(&self, user: &str) -> Result<(), AppError> {
        if self.is_full() {
            return Err(AppError::LobbyFull);
        }
        if self.visibility == Visibility::FriendsOnly && user != self.creator_id {
            let allowed = self
                .friend_snapshot
                .as_ref()
                .is_some_and(|friends| friends.contains(user));
            if !allowed {
                return Err(AppError::Forbidden(
                    "Failed to join lobby. You may not have permission to join this lobby."
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    fn remove_member(&mut self, user: &str) -> bool {
        match self.members.iter().position(|m| m == user) {
            Some(index) => {
                self.members.remove(index);
                true
            },
            None => false,
        }
    }

    fn start_voting(&mut self, requester: &str) -> Result<(), AppError> {
        if requester != self.creator_id {
            return Err(AppError::Forbidden(
                "You are not the creator of this lobby".to_string(),
            ));
        }
        if self.state == LobbyState::Voting {
            return Err(AppError::AlreadyStarted);
        }
        self.state = LobbyState::Voting;
        Ok(())
    }

    /// Client-facing representation
    pub fn view(&self) -> LobbyView {
        LobbyView {
            id: self.id.clone(),
            name: self.name.clone(),
            users: self.members.clone(),
            user_count: self.members.len(),
            state: self.is_voting(),
            filter: self.visibility,
            max_players: self.capacity,
            creator_id: self.creator_id.clone(),
        }
    }
}

/// Result of a user leaving their lobby
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub lobby_id: LobbyId,
    /// The lobby after the leave, `None` once it was removed
    pub lobby: Option<Lobby>,
    pub removed: bool,
}

#[derive(Default)]
struct Table {
    lobbies: HashMap<LobbyId, Lobby>,
    /// Which lobby each member is in; a user is in at most one
    member_index: HashMap<UserId, LobbyId>,
}

impl Table {
    fn record_active(&self) {
        gauge!(LOBBY_ACTIVE).set(self.lobbies.len() as f64);
    }
}

/// Registry of all active lobbies
pub struct LobbyRegistry {
    table: RwLock<Table>,
    friends: Arc<dyn FriendGraph>,
}

impl LobbyRegistry {
    pub fn new(friends: Arc<dyn FriendGraph>) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            friends,
        }
    }

    /// Create a lobby owned by `creator`
    pub fn create(
        &self,
        name: &str,
        visibility: Visibility,
        capacity: usize,
        creator: &str,
    ) -> Result<Lobby, AppError> {
        if capacity < MIN_CAPACITY {
            return Err(AppError::invalid(
                "max_players",
                format!("The max players field must be at least {MIN_CAPACITY}."),
            ));
        }

        let mut table = self.table.write();
        if table.member_index.contains_key(creator) {
            return Err(AppError::AlreadyInLobby);
        }
        let wanted = name.to_lowercase();
        if table.lobbies.values().any(|l| l.name.to_lowercase() == wanted) {
            return Err(AppError::NameTaken);
        }

        let lobby = Lobby::new(name, visibility, capacity, creator);
        table
            .member_index
            .insert(creator.to_string(), lobby.id.clone());
        table.lobbies.insert(lobby.id.clone(), lobby.clone());

        counter!(LOBBY_CREATED).increment(1);
        table.record_active();
        info!(lobby_id = %lobby.id, name = %lobby.name, creator, "lobby created");

        Ok(lobby)
    }

    /// Add `user` to a lobby, honoring capacity and friends-only visibility
    pub async fn join(&self, lobby_id: &str, user: &str) -> Result<Lobby, AppError> {
        let snapshot_owner = {
            let table = self.table.read();
            let lobby = table.lobbies.get(lobby_id).ok_or(AppError::LobbyNotFound)?;
            lobby
                .needs_friend_snapshot(user)
                .then(|| lobby.creator_id.clone())
        };

        let snapshot = match snapshot_owner {
            Some(creator) => {
                debug!(lobby_id, creator = %creator, "capturing creator friend list");
                Some(self.friends.friends_of(&creator).await?)
            },
            None => None,
        };

        let mut guard = self.table.write();
        let Table {
            lobbies,
            member_index,
        } = &mut *guard;

        // The lobby may have gone away while the friend list was loading
        let lobby = lobbies.get_mut(lobby_id).ok_or(AppError::LobbyNotFound)?;
        if let Some(friends) = snapshot {
            lobby.install_friend_snapshot(friends);
        }
        if lobby.contains(user) {
            return Err(AppError::AlreadyMember);
        }
        if member_index.contains_key(user) {
            return Err(AppError::AlreadyInLobby);
        }
        lobby.admit(user)?;

        lobby.members.push(user.to_string());
        member_index.insert(user.to_string(), lobby.id.clone());

        counter!(LOBBY_JOINED).increment(1);
        info!(lobby_id, user, members = lobby.members.len(), "user joined lobby");

        Ok(lobby.clone())
    }

    /// Remove `user` from whichever lobby they are in; empty lobbies are deleted
    pub fn leave(&self, user: &str) -> Result<LeaveOutcome, AppError> {
        let mut guard = self.table.write();
        let table = &mut *guard;

        let lobby_id = table.member_index.remove(user).ok_or(AppError::NotInLobby)?;
        let lobby = table.lobbies.get_mut(&lobby_id).ok_or_else(|| {
            AppError::Internal(format!("member index points at missing lobby {lobby_id}"))
        })?;
        lobby.remove_member(user);

        if lobby.members.is_empty() {
            table.lobbies.remove(&lobby_id);
            counter!(LOBBY_REMOVED).increment(1);
            table.record_active();
            info!(lobby_id = %lobby_id, user, "last member left, lobby removed");
            return Ok(LeaveOutcome {
                lobby_id,
                lobby: None,
                removed: true,
            });
        }

        info!(lobby_id = %lobby_id, user, members = lobby.members.len(), "user left lobby");
        Ok(LeaveOutcome {
            lobby: Some(lobby.clone()),
            lobby_id,
            removed: false,
        })
    }

    /// Open lobbies visible to `requester`.
    ///
    /// Lobbies are enumerated in creation order. A non-empty `search` keeps
    /// only case-insensitive name matches and leaves that order alone; without
    /// one, the fullest lobbies come first.
    pub async fn list(
        &self,
        requester: &str,
        search: &str,
        filter: ListFilter,
    ) -> Result<Vec<Lobby>, AppError> {
        let friends = match filter {
            ListFilter::Friends => Some(self.friends.friends_of(requester).await?),
            ListFilter::All => None,
        };
        let needle = search.trim().to_lowercase();

        let mut visible: Vec<Lobby> = {
            let table = self.table.read();
            table
                .lobbies
                .values()
                .filter(|l| l.state == LobbyState::Open)
                .filter(|l| needle.is_empty() || l.name.to_lowercase().contains(&needle))
                .filter(|l| {
                    friends
                        .as_ref()
                        .map_or(true, |f| f.contains(&l.creator_id))
                })
                .cloned()
                .collect()
        };

        visible.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        if needle.is_empty() {
            visible.sort_by(|a, b| b.member_count().cmp(&a.member_count()));
        }

        Ok(visible)
    }

    /// The lobby `user` is currently in
    pub fn lobby_for(&self, user: &str) -> Option<Lobby> {
        let table = self.table.read();
        table
            .member_index
            .get(user)
            .and_then(|id| table.lobbies.get(id))
            .cloned()
    }

    pub fn get(&self, lobby_id: &str) -> Option<Lobby> {
        self.table.read().lobbies.get(lobby_id).cloned()
    }

    /// Move a lobby into voting; only its creator may, and only once
    pub fn start_voting(&self, lobby_id: &str, requester: &str) -> Result<Lobby, AppError> {
        let mut table = self.table.write();
        let lobby = table
            .lobbies
            .get_mut(lobby_id)
            .ok_or(AppError::LobbyNotFound)?;
        lobby.start_voting(requester)?;

        info!(lobby_id, requester, "voting started");
        Ok(lobby.clone())
    }

    /// Drop empty lobbies created before `now - stale_after`; returns their ids
    pub fn sweep_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> Vec<LobbyId> {
        let cutoff = chrono::Duration::from_std(stale_after)
            .ok()
            .and_then(|age| now.checked_sub_signed(age));
        let Some(cutoff) = cutoff else {
            return Vec::new();
        };
        let mut table = self.table.write();

        let stale: Vec<LobbyId> = table
            .lobbies
            .values()
            .filter(|l| l.members.is_empty() && l.created_at < cutoff)
            .map(|l| l.id.clone())
            .collect();
        for id in &stale {
            table.lobbies.remove(id);
        }

        if !stale.is_empty() {
            counter!(LOBBY_SWEPT).increment(stale.len() as u64);
            table.record_active();
            info!(count = stale.len(), "stale lobbies swept");
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.table.read().lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
impl LobbyRegistry {
    /// Empty `lobby_id` and backdate its creation by `age`
    pub(crate) fn abandon(&self, lobby_id: &str, age: chrono::Duration) {
        let mut guard = self.table.write();
        let Table { lobbies, member_index } = &mut *guard;
        if let Some(lobby) = lobbies.get_mut(lobby_id) {
            lobby.created_at = Utc::now() - age;
            for member in lobby.members.drain(..) {
                member_index.remove(&member);
            }
        }
    }
}
