// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the gamenight server and its clients.
//! This module defines the JSON shapes of lobbies and voting results.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Opaque user identifier issued by the user directory
pub type UserId = String;

/// Lobby identifier, stable for the lobby's lifetime
pub type LobbyId = String;

/// Game identifier in the external game catalog
pub type GameId = u64;

/// Who may join a lobby
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Anyone may join
    #[serde(rename = "public")]
    Public,
    /// Only the creator's accepted friends may join
    #[serde(rename = "friends")]
    FriendsOnly,
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "friends" => Ok(Visibility::FriendsOnly),
            other => Err(format!("unknown visibility `{other}`")),
        }
    }
}

/// Lobby listing filter
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListFilter {
    /// Every open lobby
    #[default]
    All,
    /// Open lobbies whose creator is a friend of the requester
    Friends,
}

impl FromStr for ListFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ListFilter::All),
            "friends" => Ok(ListFilter::Friends),
            other => Err(format!("unknown filter `{other}`")),
        }
    }
}

/// Lobby as rendered to clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LobbyView {
    pub id: LobbyId,
    pub name: String,
    /// Member ids in join order
    pub users: Vec<UserId>,
    pub user_count: usize,
    /// `true` once voting has started
    pub state: bool,
    pub filter: Visibility,
    pub max_players: usize,
    pub creator_id: UserId,
}

/// A lobby member with display name
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MemberView {
    pub id: UserId,
    pub name: String,
}

/// Per-game tally of a voting session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VoteTallyView {
    pub id: GameId,
    pub name: String,
    /// Net votes (upvotes minus downvotes)
    pub votes: i64,
    pub upvotes: u32,
    pub downvotes: u32,
    pub background_image: Option<String>,
}

/// A candidate game as shown before voting
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub id: GameId,
    pub name: String,
    pub background_image: Option<String>,
}

/// Upvoted games per player, kept in lobby membership order.
///
/// Serialized as a JSON object `{ user_id: [game_id, ...] }`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerUpvotes(pub Vec<(UserId, Vec<GameId>)>);

impl PlayerUpvotes {
    pub fn get(&self, user_id: &str) -> Option<&[GameId]> {
        self.0
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, games)| games.as_slice())
    }
}

impl Serialize for PlayerUpvotes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (user_id, games) in &self.0 {
            map.serialize_entry(user_id, games)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlayerUpvotes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UpvotesVisitor;

        impl<'de> Visitor<'de> for UpvotesVisitor {
            type Value = PlayerUpvotes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of user ids to game id lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((user_id, games)) = access.next_entry::<UserId, Vec<GameId>>()? {
                    entries.push((user_id, games));
                }
                Ok(PlayerUpvotes(entries))
            }
        }

        deserializer.deserialize_map(UpvotesVisitor)
    }
}

/// Response body of `GET /voteResult`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VoteResultsView {
    pub lobby_id: LobbyId,
    /// Sorted by `votes`, highest first
    pub games: Vec<VoteTallyView>,
    pub players_favorite_games: PlayerUpvotes,
    /// Sum of net votes over all games
    pub total_votes_cast: i64,
    pub total_players: usize,
    /// Ballot cells: -1, 0 or 1 per player and game
    pub player_votes: BTreeMap<UserId, BTreeMap<GameId, i8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_wire_names() {
        assert_eq!(serde_json::to_string(&Visibility::Public).unwrap(), "\"public\"");
        assert_eq!(serde_json::to_string(&Visibility::FriendsOnly).unwrap(), "\"friends\"");
        assert_eq!("friends".parse::<Visibility>().unwrap(), Visibility::FriendsOnly);
        assert!("private".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_list_filter_parse() {
        assert_eq!("all".parse::<ListFilter>().unwrap(), ListFilter::All);
        assert_eq!("friends".parse::<ListFilter>().unwrap(), ListFilter::Friends);
        assert!("everyone".parse::<ListFilter>().is_err());
        assert_eq!(ListFilter::default(), ListFilter::All);
    }

    #[test]
    fn test_player_upvotes_keeps_member_order() {
        let upvotes = PlayerUpvotes(vec![
            ("zed".to_string(), vec![3]),
            ("amy".to_string(), vec![]),
        ]);
        let json = serde_json::to_string(&upvotes).unwrap();
        assert_eq!(json, r#"{"zed":[3],"amy":[]}"#);
        assert_eq!(upvotes.get("amy"), Some(&[][..]));
        assert_eq!(upvotes.get("bob"), None);
    }

    #[test]
    fn test_lobby_view_shape() {
        let view = LobbyView {
            id: "lobby_1".to_string(),
            name: "Trivia".to_string(),
            users: vec!["u1".to_string()],
            user_count: 1,
            state: false,
            filter: Visibility::Public,
            max_players: 4,
            creator_id: "u1".to_string(),
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["filter"], "public");
        assert_eq!(value["state"], false);
        assert_eq!(value["user_count"], 1);
        assert_eq!(value["creator_id"], "u1");
    }
}
