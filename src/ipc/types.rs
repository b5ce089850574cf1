use std::path::PathBuf;

use crate::config::DaemonConfig;
use crate::controller::Listings;
use crate::repo::Backend;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub listings: Listings,
    pub config: DaemonConfig,
}

impl AppState {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            workspace: None,
            backend: None,
            listings: Listings::new(config.cache_ttl, config.cache_policy),
            config,
        }
    }
}
