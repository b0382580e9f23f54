//! Configuration for a map front-end and the tile system behind it
//!
//! Everything is serde-deserializable and fully defaulted, so a JSON file only
//! needs the knobs it wants to change:
//!
//! ```json
//! {
//!   "center": { "lat": 48.8566, "lng": 2.3522 },
//!   "zoom": 12,
//!   "provider": {
//!     "type": "fallback",
//!     "primary": { "type": "remote", "url_template": "https://tile.openstreetmap.org/{z}/{x}/{y}.png" },
//!     "secondary": { "type": "synthetic" }
//!   },
//!   "manager": { "max_concurrent_fetches": 4 }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MAX_ZOOM_LEVEL};
use super::geo::LatLng;
use crate::tiles::http::{ReqwestClient, DEFAULT_USER_AGENT};
use crate::tiles::source::{UrlTemplate, OSM_URL_TEMPLATE};
use crate::tiles::{FallbackProvider, RemoteProvider, SyntheticProvider, TileManagerConfig, TileProvider};
use crate::{MapError, Result};

/// Which tile provider(s) back the tile manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Fetch tiles over HTTP from a `{z}/{x}/{y}` URL template
    Remote {
        #[serde(default = "default_url_template")]
        url_template: String,
        /// Values substituted for `{s}`, picked per tile
        #[serde(default)]
        subdomains: Vec<String>,
        #[serde(default = "default_user_agent")]
        user_agent: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Locally generated placeholder tiles labelled with their address
    Synthetic,
    /// Try `primary`, consult `secondary` only when it fails
    Fallback {
        primary: Box<ProviderConfig>,
        secondary: Box<ProviderConfig>,
    },
}

fn default_url_template() -> String {
    OSM_URL_TEMPLATE.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl ProviderConfig {
    /// OpenStreetMap with the default client settings
    pub fn openstreetmap() -> Self {
        Self::Remote {
            url_template: default_url_template(),
            subdomains: Vec::new(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Instantiate the provider chain
    pub fn build(&self) -> Result<Arc<dyn TileProvider>> {
        Ok(match self {
            Self::Remote {
                url_template,
                subdomains,
                user_agent,
                timeout_secs,
            } => {
                let source = UrlTemplate::parse(url_template)?.with_subdomains(subdomains.clone());
                let client = ReqwestClient::with_settings(user_agent, *timeout_secs)?;
                Arc::new(RemoteProvider::new(source, client))
            }
            Self::Synthetic => Arc::new(SyntheticProvider::new()),
            Self::Fallback { primary, secondary } => {
                Arc::new(FallbackProvider::new(primary.build()?, secondary.build()?))
            }
        })
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Remote {
                url_template,
                user_agent,
                ..
            } => {
                UrlTemplate::parse(url_template)?;
                if user_agent.trim().is_empty() {
                    return Err(MapError::Config(
                        "remote provider needs a non-empty user agent".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Synthetic => Ok(()),
            Self::Fallback { primary, secondary } => {
                primary.validate()?;
                secondary.validate()
            }
        }
    }
}

impl Default for ProviderConfig {
    /// OpenStreetMap, degrading to placeholder tiles when it can't be reached
    fn default() -> Self {
        Self::Fallback {
            primary: Box::new(Self::openstreetmap()),
            secondary: Box::new(Self::Synthetic),
        }
    }
}

/// Top-level configuration: view bounds, initial view and tile backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Initial view center
    pub center: LatLng,
    /// Initial zoom level
    pub zoom: u8,
    /// Initial viewport size in pixels, `(width, height)`
    pub viewport: (u32, u32),
    pub provider: ProviderConfig,
    pub manager: TileManagerConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            center: LatLng::new(51.507222, -0.1275), // London
            zoom: 4,
            viewport: (1024, 768),
            provider: ProviderConfig::default(),
            manager: TileManagerConfig::default(),
        }
    }
}

impl MapConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| MapError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_zoom > self.max_zoom {
            return Err(MapError::Config(format!(
                "min_zoom {} is above max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_zoom > MAX_ZOOM_LEVEL {
            return Err(MapError::Config(format!(
                "max_zoom {} exceeds the supported maximum of {}",
                self.max_zoom, MAX_ZOOM_LEVEL
            )));
        }
        if !(self.min_zoom..=self.max_zoom).contains(&self.zoom) {
            return Err(MapError::Config(format!(
                "initial zoom {} is outside [{}, {}]",
                self.zoom, self.min_zoom, self.max_zoom
            )));
        }
        if !self.center.is_valid() {
            return Err(MapError::Config(format!("invalid center {}", self.center)));
        }
        self.manager.validate()?;
        self.provider.validate()
    }
}
