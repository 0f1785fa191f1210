//! Cache backend settings.

use serde::{Deserialize, Serialize};

/// Port Redis listens on unless configured otherwise.
pub const REDIS_PORT: u16 = 6379;

/// Cache backend selected by `CACHE_TYPE`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CacheType {
    /// In-process memory
    #[default]
    Simple,
    /// Redis server
    Redis,
}

impl CacheType {
    /// Port used when none is configured.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            CacheType::Simple => None,
            CacheType::Redis => Some(REDIS_PORT),
        }
    }
}

/// Where the cache lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Backend type
    #[serde(rename = "type", default)]
    pub cache_type: CacheType,
    /// Server host
    #[serde(default)]
    pub host: Option<String>,
    /// Server port
    #[serde(default)]
    pub port: Option<u16>,
    /// Server password
    #[serde(default)]
    pub password: Option<String>,
    /// Database number on the server
    #[serde(default)]
    pub db: u32,
}

impl CacheSettings {
    /// Whether a server backend is selected without a host to reach it.
    pub fn needs_connection_details(&self) -> bool {
        self.cache_type != CacheType::Simple && self.host.is_none()
    }

    /// Configured port, falling back to the backend default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.cache_type.default_port())
    }
}
