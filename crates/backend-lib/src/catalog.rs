// ============================
// gamenight-backend-lib/src/catalog.rs
// ============================
//! External game catalog client.
//!
//! The catalog is unreliable by assumption: every lookup is bounded by a
//! timeout and most callers degrade to missing metadata instead of failing.
use std::time::Duration;

use ::metrics::counter;
use async_trait::async_trait;
use gamenight_common::GameId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::CatalogSettings;
use crate::metrics::CATALOG_FAILURE;

/// Catalog failures
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog request failed: {0}")]
    Http(String),

    #[error("catalog returned status {0}")]
    Status(u16),

    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            CatalogError::Status(status.as_u16())
        } else {
            CatalogError::Http(err.to_string())
        }
    }
}

/// Game metadata as returned by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameInfo {
    pub id: GameId,
    pub name: String,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Lookup interface over the external game catalog
#[async_trait]
pub trait GameCatalog: Send + Sync {
    /// Fetch a single game by id
    async fn game(&self, id: GameId) -> Result<GameInfo, CatalogError>;

    /// Free-text search, one page of results
    async fn search(&self, query: &str, page: u32) -> Result<Vec<GameInfo>, CatalogError>;
}

/// RAWG-compatible HTTP catalog
#[derive(Clone)]
pub struct RawgCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<GameInfo>,
}

impl RawgCatalog {
    pub fn new(settings: &CatalogSettings) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            page_size: settings.search_page_size,
        })
    }
}

#[async_trait]
impl GameCatalog for RawgCatalog {
    async fn game(&self, id: GameId) -> Result<GameInfo, CatalogError> {
        let url = format!("{}/games/{}", self.base_url, id);
        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<GameInfo>().await?)
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<GameInfo>, CatalogError> {
        let url = format!("{}/games", self.base_url);
        let page = page.max(1).to_string();
        let page_size = self.page_size.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("search", query),
                ("page", page.as_str()),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<SearchPage>().await?.results)
    }
}

/// Look a game up, giving up after `limit`.
///
/// Failures are logged and counted, never propagated.
pub async fn lookup_bounded(
    catalog: &dyn GameCatalog,
    id: GameId,
    limit: Duration,
) -> Option<GameInfo> {
    let outcome = match tokio::time::timeout(limit, catalog.game(id)).await {
        Ok(result) => result,
        Err(_) => Err(CatalogError::Timeout),
    };

    match outcome {
        Ok(info) => Some(info),
        Err(err) => {
            warn!(game_id = id, error = %err, "game catalog lookup failed");
            counter!(CATALOG_FAILURE).increment(1);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowCatalog;

    #[async_trait]
    impl GameCatalog for SlowCatalog {
        async fn game(&self, id: GameId) -> Result<GameInfo, CatalogError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(GameInfo {
                id,
                name: "Too Late".to_string(),
                background_image: None,
                released: None,
                rating: None,
            })
        }

        async fn search(&self, _query: &str, _page: u32) -> Result<Vec<GameInfo>, CatalogError> {
            Ok(Vec::new())
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl GameCatalog for BrokenCatalog {
        async fn game(&self, _id: GameId) -> Result<GameInfo, CatalogError> {
            Err(CatalogError::Status(503))
        }

        async fn search(&self, _query: &str, _page: u32) -> Result<Vec<GameInfo>, CatalogError> {
            Err(CatalogError::Status(503))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_gives_up_after_timeout() {
        let info = lookup_bounded(&SlowCatalog, 7, Duration::from_millis(100)).await;
        assert!(info.is_none());
    }

    #[tokio::test]
    async fn test_lookup_degrades_on_failure() {
        let info = lookup_bounded(&BrokenCatalog, 7, Duration::from_secs(1)).await;
        assert!(info.is_none());
    }

    #[test]
    fn test_game_info_tolerates_missing_fields() {
        let info: GameInfo = serde_json::from_str(r#"{"id": 42, "name": "Portal 2", "slug": "portal-2"}"#).unwrap();
        assert_eq!(info.id, 42);
        assert_eq!(info.background_image, None);
    }

    #[test]
    fn test_rawg_catalog_trims_base_url() {
        let settings = CatalogSettings {
            base_url: "https://catalog.test/api/".to_string(),
            ..CatalogSettings::default()
        };
        let catalog = RawgCatalog::new(&settings).unwrap();
        assert_eq!(catalog.base_url, "https://catalog.test/api");
    }
}
