// ============================
// gamenight-backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `GAMENIGHT_CATALOG__API_KEY`
pub const ENV_PREFIX: &str = "GAMENIGHT_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Directory holding the user directory snapshot
    pub data_dir: PathBuf,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Bearer token TTL in seconds
    pub session_ttl_secs: u64,
    pub lobby: LobbySettings,
    pub catalog: CatalogSettings,
    pub voting: VotingSettings,
}

/// Lobby limits and stale-lobby eviction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbySettings {
    /// Empty lobbies older than this are swept
    pub stale_after_secs: u64,
    /// How often the sweeper runs
    pub sweep_interval_secs: u64,
    pub max_name_len: usize,
    pub min_players: usize,
    pub max_players: usize,
}

/// External game catalog (RAWG compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_key: String,
    /// Upper bound for a single catalog request
    pub timeout_ms: u64,
    pub search_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VotingSettings {
    /// Let players replace a vote they already cast
    pub allow_revote: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            lobby: LobbySettings::default(),
            catalog: CatalogSettings::default(),
            voting: VotingSettings::default(),
        }
    }
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            stale_after_secs: 30 * 60,
            sweep_interval_secs: 60,
            max_name_len: 50,
            min_players: 2,
            max_players: 24,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.rawg.io/api".to_string(),
            api_key: String::new(),
            timeout_ms: 5_000,
            search_page_size: 12,
        }
    }
}

impl LobbySettings {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl CatalogSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Settings {
    /// Load settings from the working directory and the environment
    pub fn load() -> Result<Self> {
        let figment = Self::base()
            .merge(Toml::file("config.toml"))
            .merge(Yaml::file("config.yaml"))
            .merge(Json::file("config.json"));
        Self::finish(figment)
    }

    /// Load settings from an explicit file; the format follows the extension
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::base().merge(Yaml::file(path)),
            Some("json") => Self::base().merge(Json::file(path)),
            _ => Self::base().merge(Toml::file(path)),
        };
        Self::finish(figment)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    fn finish(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            bail!("invalid log level `{}`", self.log_level);
        }
        if self.session_ttl_secs == 0 {
            bail!("session_ttl_secs must be positive");
        }
        if self.lobby.sweep_interval_secs == 0 {
            bail!("lobby.sweep_interval_secs must be positive");
        }
        if self.lobby.min_players < 2 || self.lobby.min_players > self.lobby.max_players {
            bail!(
                "lobby player limits must satisfy 2 <= min ({}) <= max ({})",
                self.lobby.min_players,
                self.lobby.max_players
            );
        }
        if self.lobby.max_name_len == 0 {
            bail!("lobby.max_name_len must be positive");
        }
        if self.catalog.timeout_ms == 0 {
            bail!("catalog.timeout_ms must be positive");
        }
        Ok(())
    }
}
