//! Configuration schema for halocat
//!
//! Configuration is stored at `~/.config/halocat/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory (default: platform cache dir + `halocat`)
    pub dir: Option<PathBuf>,

    /// File name of the cache log inside the cache directory
    pub log_filename: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            log_filename: "halo_table_cache_log.txt".to_string(),
        }
    }
}
