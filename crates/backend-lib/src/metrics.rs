// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOBBY_CREATED: &str = "lobby.created";
pub const LOBBY_JOINED: &str = "lobby.joined";
pub const LOBBY_REMOVED: &str = "lobby.removed";
pub const LOBBY_ACTIVE: &str = "lobby.active";
pub const LOBBY_SWEPT: &str = "lobby.swept";
pub const VOTE_SESSION_CREATED: &str = "vote.session_created";
pub const VOTE_CAST: &str = "vote.cast";
pub const CATALOG_FAILURE: &str = "catalog.failure";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_ACTIVE: &str = "session.active";
