//! Voting sessions: one ballot table per lobby in the voting state.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ::metrics::counter;
use dashmap::{mapref::entry::Entry, DashMap};
use futures_util::future::join_all;
use gamenight_common::{GameId, GameSummary, LobbyId, PlayerUpvotes, UserId, VoteTallyView};
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{lookup_bounded, GameCatalog};
use crate::error::AppError;
use crate::lobby::{Lobby, LobbyRegistry};
use crate::metrics::{VOTE_CAST, VOTE_SESSION_CREATED};
use crate::storage::Storage;

/// Name shown for a candidate the catalog could not describe
pub const UNKNOWN_GAME_NAME: &str = "Unknown Game";

/// A single up or down vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn value(self) -> i8 {
        match self {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

impl TryFrom<i64> for Vote {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Vote::Up),
            -1 => Ok(Vote::Down),
            _ => Err(AppError::invalid("vote", "The selected vote is invalid.")),
        }
    }
}

/// A game up for vote with its running tallies
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub game_id: GameId,
    pub name: String,
    pub upvotes: u32,
    pub downvotes: u32,
    pub net_votes: i64,
    pub background_image: Option<String>,
}

impl Candidate {
    pub fn new(game_id: GameId, name: impl Into<String>, background_image: Option<String>) -> Self {
        Self {
            game_id,
            name: name.into(),
            upvotes: 0,
            downvotes: 0,
            net_votes: 0,
            background_image,
        }
    }

    pub fn tally(&self) -> VoteTallyView {
        VoteTallyView {
            id: self.game_id,
            name: self.name.clone(),
            votes: self.net_votes,
            upvotes: self.upvotes,
            downvotes: self.downvotes,
            background_image: self.background_image.clone(),
        }
    }
}

/// Snapshot of a session's tallies
#[derive(Debug, Clone)]
pub struct VoteResults {
    /// Candidates in session order
    pub games: Vec<VoteTallyView>,
    pub total_votes_cast: i64,
    pub player_votes: BTreeMap<UserId, BTreeMap<GameId, i8>>,
}

/// Ballots and tallies for one lobby.
///
/// Every ballot holder has a cell for every candidate, so the net tally of a
/// candidate always equals the sum of its column.
#[derive(Debug)]
pub struct VoteSession {
    id: String,
    lobby_id: LobbyId,
    candidates: Vec<Candidate>,
    index: HashMap<GameId, usize>,
    ballots: HashMap<UserId, HashMap<GameId, i8>>,
}

impl VoteSession {
    /// Fresh session with a zeroed ballot row for each of `members`
    pub fn new(lobby_id: &str, members: &[UserId], candidates: Vec<Candidate>) -> Self {
        let mut unique = Vec::with_capacity(candidates.len());
        let mut index = HashMap::with_capacity(candidates.len());
        for candidate in candidates {
            if !index.contains_key(&candidate.game_id) {
                index.insert(candidate.game_id, unique.len());
                unique.push(candidate);
            }
        }

        let row: HashMap<GameId, i8> = unique.iter().map(|c| (c.game_id, 0)).collect();
        let ballots = members.iter().map(|m| (m.clone(), row.clone())).collect();

        Self {
            id: format!("vote_{}", Uuid::new_v4().simple()),
            lobby_id: lobby_id.to_string(),
            candidates: unique,
            index,
            ballots,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Current ballot cell, `None` when `user` holds no ballot or the game is not a candidate
    pub fn ballot(&self, user: &str, game_id: GameId) -> Option<i8> {
        self.ballots.get(user)?.get(&game_id).copied()
    }

    /// Record `vote`, replacing any earlier vote by `user` on that game
    pub fn cast_vote(
        &mut self,
        game_id: GameId,
        user: &str,
        vote: Vote,
    ) -> Result<VoteTallyView, AppError> {
        let position = *self
            .index
            .get(&game_id)
            .ok_or(AppError::UnknownGame(game_id))?;
        let row = self
            .ballots
            .get_mut(user)
            .ok_or(AppError::NotABallotHolder)?;
        let cell = row.entry(game_id).or_insert(0);
        let previous = *cell;
        let candidate = &mut self.candidates[position];

        match previous {
            1 => candidate.upvotes -= 1,
            -1 => candidate.downvotes -= 1,
            _ => {},
        }
        match vote {
            Vote::Up => candidate.upvotes += 1,
            Vote::Down => candidate.downvotes += 1,
        }
        candidate.net_votes += i64::from(vote.value() - previous);
        *cell = vote.value();

        counter!(VOTE_CAST).increment(1);
        debug!(lobby_id = %self.lobby_id, user, game_id, vote = vote.value(), "vote recorded");

        Ok(candidate.tally())
    }

    pub fn results(&self) -> VoteResults {
        let player_votes = self
            .ballots
            .iter()
            .map(|(user, row)| {
                let row = row.iter().map(|(game, value)| (*game, *value)).collect();
                (user.clone(), row)
            })
            .collect();

        VoteResults {
            games: self.candidates.iter().map(Candidate::tally).collect(),
            total_votes_cast: self.candidates.iter().map(|c| c.net_votes).sum(),
            player_votes,
        }
    }

    /// Games each of `members` upvoted, in candidate order
    pub fn voted_games(&self, members: &[UserId]) -> PlayerUpvotes {
        let entries = members
            .iter()
            .map(|member| {
                let upvoted = match self.ballots.get(member) {
                    Some(row) => self
                        .candidates
                        .iter()
                        .filter(|c| row.get(&c.game_id) == Some(&1))
                        .map(|c| c.game_id)
                        .collect(),
                    None => Vec::new(),
                };
                (member.clone(), upvoted)
            })
            .collect();
        PlayerUpvotes(entries)
    }

    pub fn summaries(&self) -> Vec<GameSummary> {
        self.candidates
            .iter()
            .map(|c| GameSummary {
                id: c.game_id,
                name: c.name.clone(),
                background_image: c.background_image.clone(),
            })
            .collect()
    }
}

pub type SessionHandle = Arc<Mutex<VoteSession>>;

/// Vote sessions keyed by lobby id
#[derive(Default)]
pub struct VoteRegistry {
    sessions: DashMap<LobbyId, SessionHandle>,
}

impl VoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, lobby_id: &str) -> Option<SessionHandle> {
        self.sessions.get(lobby_id).map(|entry| entry.value().clone())
    }

    /// The session for `lobby`, created on first use.
    ///
    /// Returns `None` while the lobby is still open. `supplier` runs without
    /// any lock held; when two callers race, the first insert wins and the
    /// other's candidates are discarded. `lobby` may be a stale copy, so the
    /// insert only happens while `lobbies` still holds it in the voting state.
    pub async fn get_or_create<F, Fut>(
        &self,
        lobbies: &LobbyRegistry,
        lobby: &Lobby,
        supplier: F,
    ) -> Result<Option<SessionHandle>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Candidate>, AppError>>,
    {
        if !lobby.is_voting() {
            return Ok(None);
        }
        if let Some(handle) = self.get(lobby.id()) {
            return Ok(Some(handle));
        }

        let candidates = supplier().await?;
        let handle = match self.sessions.entry(lobby.id().to_string()) {
            Entry::Occupied(entry) => return Ok(Some(entry.get().clone())),
            Entry::Vacant(entry) => {
                // Leaving removes the lobby before its session, so a lobby
                // seen here is cleaned up after this insert
                let Some(live) = lobbies.get(lobby.id()).filter(Lobby::is_voting) else {
                    debug!(lobby_id = %lobby.id(), "lobby gone before vote session was stored");
                    return Ok(None);
                };
                let session = VoteSession::new(live.id(), live.members(), candidates);
                entry.insert(Arc::new(Mutex::new(session))).value().clone()
            },
        };

        counter!(VOTE_SESSION_CREATED).increment(1);
        info!(
            lobby_id = %lobby.id(),
            session_id = %handle.lock().id(),
            "vote session created"
        );
        Ok(Some(handle))
    }

    pub fn remove(&self, lobby_id: &str) -> bool {
        self.sessions.remove(lobby_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Union of the members' favorites, described by the catalog.
///
/// Members are walked in order and each member's favorites in the order
/// they were added; a game favorited twice keeps its first position. Games
/// the catalog cannot describe in time become "Unknown Game".
pub async fn collect_candidates<S: Storage + ?Sized>(
    members: &[UserId],
    storage: &S,
    catalog: &dyn GameCatalog,
    limit: Duration,
) -> Result<Vec<Candidate>, AppError> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for member in members {
        for game in storage.favorite_games(member).await? {
            if seen.insert(game) {
                ids.push(game);
            }
        }
    }

    let infos = join_all(ids.iter().map(|&id| lookup_bounded(catalog, id, limit))).await;

    Ok(ids
        .into_iter()
        .zip(infos)
        .map(|(id, info)| match info {
            Some(info) => Candidate::new(id, info.name, info.background_image),
            None => Candidate::new(id, UNKNOWN_GAME_NAME, None),
        })
        .collect())
}
