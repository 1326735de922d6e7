use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{
    DEFAULT_EVENT_BUS_BUFFER_SIZE, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_POLL_FAST_SECS,
    DEFAULT_POLL_SLOW_SECS, DEFAULT_SSE_HEARTBEAT_INTERVAL_SECONDS,
    DEFAULT_STALENESS_WINDOW_MINUTES,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,

    pub polling: PollingConfig,

    pub auth: AdminAuthConfig,

    pub request_manager: RequestManagerConfig,

    pub indexer_movies: IndexerConfig,

    pub indexer_tv: IndexerConfig,

    pub torrent: TorrentConfig,

    pub anime_service: AnimeServiceConfig,

    pub media_server: MediaServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            polling: PollingConfig::default(),
            auth: AdminAuthConfig::default(),
            request_manager: RequestManagerConfig::default(),
            indexer_movies: IndexerConfig::default(),
            indexer_tv: IndexerConfig::default(),
            torrent: TorrentConfig::default(),
            anime_service: AnimeServiceConfig::default(),
            media_server: MediaServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Prefix stripped from every path reported by an external service
    /// before it's compared against a stored `final_path` (spec §4).
    pub media_path_prefix: Option<String>,

    /// Event bus buffer size (default: 256).
    pub event_bus_buffer_size: usize,

    /// If true, the deletion orchestrator fans a confirmed removal out to
    /// every applicable external service. If false, deletions only update
    /// local state and never call out (spec §4.H "kill switch").
    pub enable_deletion_sync: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/waypoint.db".to_string(),
            log_level: "info".to_string(),
            media_path_prefix: None,
            event_bus_buffer_size: DEFAULT_EVENT_BUS_BUFFER_SIZE,
            enable_deletion_sync: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// SSE heartbeat interval, in seconds (spec §4.I).
    pub sse_heartbeat_interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 7890,
            cors_allowed_origins: vec!["*".to_string()],
            sse_heartbeat_interval_seconds: DEFAULT_SSE_HEARTBEAT_INTERVAL_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub metrics_port: Option<u16>,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "waypoint".to_string());

        Self {
            metrics_enabled: true,
            metrics_port: None,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

/// Progress-provider and verifier cadence (spec §4.F/§4.G).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub poll_fast_seconds: u64,

    pub poll_slow_seconds: u64,

    pub staleness_window_minutes: i64,

    /// How long the anime-service import-folder cache trusts a resolved
    /// absolute path before revalidating it (spec §4.B "vfs regeneration").
    pub vfs_regeneration_delay_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_fast_seconds: DEFAULT_POLL_FAST_SECS,
            poll_slow_seconds: DEFAULT_POLL_SLOW_SECS,
            staleness_window_minutes: DEFAULT_STALENESS_WINDOW_MINUTES,
            vfs_regeneration_delay_seconds: 60,
        }
    }
}

/// Admin-gate config (spec §4.J): user ids allowed past the bearer-token
/// check, regardless of what the media server itself would authorize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminAuthConfig {
    pub admin_user_ids: Vec<String>,
}

impl Default for AdminAuthConfig {
    fn default() -> Self {
        Self { admin_user_ids: vec![] }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestManagerConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for RequestManagerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5055".to_string(),
            api_key: String::new(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7878".to_string(),
            api_key: String::new(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
}

impl Default for TorrentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimeServiceConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    /// TTL for the import-folder cache, in seconds (spec §4.B).
    pub import_folder_cache_ttl_seconds: u64,
}

impl Default for AnimeServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6969".to_string(),
            api_key: String::new(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS,
            import_folder_cache_ttl_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaServerConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for MediaServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8096".to_string(),
            api_key: String::new(),
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = 'load: {
            for path in &paths {
                if path.exists() {
                    info!("Loading config from: {}", path.display());
                    break 'load Self::load_from_path(path)?;
                }
            }
            info!("No config file found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies the env-var overrides spec §6 requires on top of whatever
    /// the TOML file (or defaults) set. Only the keys spec.md §6 names are
    /// overridable this way; everything else is TOML-only.
    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("ADMIN_USER_IDS") {
            self.auth.admin_user_ids = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = env_bool("ENABLE_DELETION_SYNC") {
            self.general.enable_deletion_sync = v;
        }
        if let Ok(v) = std::env::var("MEDIA_PATH_PREFIX") {
            self.general.media_path_prefix = Some(v);
        }
        if let Some(v) = env_parse::<u64>("POLL_FAST") {
            self.polling.poll_fast_seconds = v;
        }
        if let Some(v) = env_parse::<u64>("POLL_SLOW") {
            self.polling.poll_slow_seconds = v;
        }
        if let Some(v) = env_parse::<u64>("VFS_REGENERATION_DELAY") {
            self.polling.vfs_regeneration_delay_seconds = v;
        }
        if let Some(v) = env_parse::<i64>("STALENESS_WINDOW_MINUTES") {
            self.polling.staleness_window_minutes = v;
        }
        if let Some(v) = env_parse::<u64>("SSE_HEARTBEAT_INTERVAL_SECONDS") {
            self.server.sse_heartbeat_interval_seconds = v;
        }

        apply_service_env(&mut self.request_manager.base_url, &mut self.request_manager.api_key, "REQUEST_MANAGER");
        apply_service_env(&mut self.indexer_movies.base_url, &mut self.indexer_movies.api_key, "INDEXER_MOVIES");
        apply_service_env(&mut self.indexer_tv.base_url, &mut self.indexer_tv.api_key, "INDEXER_TV");
        apply_service_env(&mut self.anime_service.base_url, &mut self.anime_service.api_key, "ANIME_SERVICE");
        apply_service_env(&mut self.media_server.base_url, &mut self.media_server.api_key, "MEDIA_SERVER");
        if let Ok(v) = std::env::var("TORRENT_BASE_URL") {
            self.torrent.base_url = v;
        }
        if let Ok(v) = std::env::var("TORRENT_USERNAME") {
            self.torrent.username = v;
        }
        if let Ok(v) = std::env::var("TORRENT_PASSWORD") {
            self.torrent.password = v;
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("waypoint").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".waypoint").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.enabled && self.server.port == 0 {
            anyhow::bail!("server port cannot be 0 when enabled");
        }
        if self.polling.poll_fast_seconds == 0 || self.polling.poll_slow_seconds == 0 {
            anyhow::bail!("poll intervals must be > 0");
        }
        if self.polling.poll_fast_seconds > self.polling.poll_slow_seconds {
            anyhow::bail!("poll_fast_seconds must not exceed poll_slow_seconds");
        }
        if self.general.enable_deletion_sync && self.media_server.base_url.is_empty() {
            anyhow::bail!("media_server.base_url cannot be empty when deletion sync is enabled");
        }
        Ok(())
    }
}

fn apply_service_env(base_url: &mut String, api_key: &mut String, prefix: &str) {
    if let Ok(v) = std::env::var(format!("{prefix}_BASE_URL")) {
        *base_url = v;
    }
    if let Ok(v) = std::env::var(format!("{prefix}_API_KEY")) {
        *api_key = v;
    }
}

fn env_bool(key: &str) -> Option<bool> {
    match std::env::var(key).ok()?.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.poll_fast_seconds, DEFAULT_POLL_FAST_SECS);
    }

    #[test]
    fn config_serialization_round_trips() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[polling]"));
        assert!(toml_str.contains("[media_server]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.polling.poll_fast_seconds, config.polling.poll_fast_seconds);
    }

    #[test]
    fn fast_poll_may_not_exceed_slow_poll() {
        let mut config = Config::default();
        config.polling.poll_fast_seconds = 30;
        config.polling.poll_slow_seconds = 15;
        assert!(config.validate().is_err());
    }

    #[test]
    fn admin_user_ids_split_on_comma_and_trim() {
        // simulated inline rather than via std::env::set_var to avoid
        // cross-test races on process-global env state.
        let raw = " abc123 , def456,ghi789 ";
        let ids: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        assert_eq!(ids, vec!["abc123", "def456", "ghi789"]);
    }
}
