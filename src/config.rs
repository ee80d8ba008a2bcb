//! Service configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `PLEME_CONTENT_GRAPH_*` environment variables (`__` separates nested keys,
//! e.g. `PLEME_CONTENT_GRAPH_IDENTITIES__ADMIN_USER`).

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ENV_PREFIX: &str = "PLEME_CONTENT_GRAPH_";
const CONFIG_PATH_VAR: &str = "PLEME_CONTENT_GRAPH_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "content-graph.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The address the server binds to
    pub listen: SocketAddr,
    /// Fallback `tracing_subscriber::EnvFilter` directive when `RUST_LOG` is unset
    pub log_filter: String,
    pub identities: IdentityConfig,
}

/// API key table for the role gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// User name that maps to the admin role; every other user is a client
    pub admin_user: String,
    /// API key → user name
    pub api_keys: BTreeMap<String, String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let api_keys = [("client_api_key", "client"), ("admin_api_key", "admin")]
            .into_iter()
            .map(|(key, user)| (key.to_string(), user.to_string()))
            .collect();

        Self {
            admin_user: "admin".to_string(),
            api_keys,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_filter: "info".to_string(),
            identities: IdentityConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration
    ///
    /// The file is read from `$PLEME_CONTENT_GRAPH_CONFIG`, or
    /// `./content-graph.toml` when that is unset. A missing file is fine.
    pub fn load() -> Result<Self, figment::Error> {
        let path: PathBuf = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => path.into(),
            Err(e) => {
                debug!("Cannot read env var for config path: {}", e);
                PathBuf::from(DEFAULT_CONFIG_FILE)
            }
        };

        Self::figment(Toml::file(path)).extract()
    }

    /// Defaults, then `file`, then the environment
    fn figment(file: impl figment::Provider) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
