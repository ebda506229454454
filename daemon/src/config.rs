//! Daemon configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokengate_membership::discord::DEFAULT_API_BASE;
use tokengate_utils::LogFormat;
use tokengate_verification::DEFAULT_SESSION_TTL_SECS;

use crate::error::DaemonError;

/// Configuration for a tokengate deployment.
///
/// Every field has a default, so an empty file is valid. Secrets are absent:
/// the Discord bot token is read from `TOKENGATE_DISCORD_TOKEN` and the
/// session-creation secret from `TOKENGATE_API_TOKEN`, env only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// LMDB directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Upper bound on the LMDB memory map, in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Address the HTTP API binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Lifetime of a verification session.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Name shown in challenge messages.
    #[serde(default = "default_community_name")]
    pub community_name: String,

    /// DAS JSON-RPC endpoint.
    #[serde(default)]
    pub oracle_url: String,

    #[serde(default = "default_oracle_page_limit")]
    pub oracle_page_limit: u32,

    #[serde(default = "default_oracle_max_pages")]
    pub oracle_max_pages: u32,

    #[serde(default = "default_discord_api_base")]
    pub discord_api_base: String,

    /// Guild whose member roles are reconciled.
    #[serde(default)]
    pub guild_id: String,

    /// Subjects reconciled concurrently.
    #[serde(default = "default_sync_workers")]
    pub sync_workers: usize,

    /// Timeout for every oracle, membership and store call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// 0 runs a single pass; anything else repeats passes until signalled.
    #[serde(default)]
    pub sync_interval_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tokengate_data")
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_community_name() -> String {
    "the community".to_string()
}

fn default_oracle_page_limit() -> u32 {
    1000
}

fn default_oracle_max_pages() -> u32 {
    10
}

fn default_discord_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_sync_workers() -> usize {
    4
}

fn default_call_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GateConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, DaemonError> {
        toml::from_str(s).map_err(|e| DaemonError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, DaemonError> {
        toml::to_string_pretty(self).map_err(|e| DaemonError::Config(e.to_string()))
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lmdb_map_size: default_lmdb_map_size(),
            listen_addr: default_listen_addr(),
            session_ttl_secs: default_session_ttl_secs(),
            community_name: default_community_name(),
            oracle_url: String::new(),
            oracle_page_limit: default_oracle_page_limit(),
            oracle_max_pages: default_oracle_max_pages(),
            discord_api_base: default_discord_api_base(),
            guild_id: String::new(),
            sync_workers: default_sync_workers(),
            call_timeout_secs: default_call_timeout_secs(),
            sync_interval_secs: 0,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

/// Settings that CLI flags and `TOKENGATE_*` env vars can override.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// LMDB directory.
    #[arg(long, env = "TOKENGATE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TOKENGATE_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TOKENGATE_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// HTTP listen address.
    #[arg(long, env = "TOKENGATE_LISTEN_ADDR", global = true)]
    pub listen_addr: Option<SocketAddr>,

    /// Community name used in challenge messages.
    #[arg(long, env = "TOKENGATE_COMMUNITY_NAME", global = true)]
    pub community_name: Option<String>,

    /// DAS JSON-RPC endpoint.
    #[arg(long, env = "TOKENGATE_ORACLE_URL", global = true)]
    pub oracle_url: Option<String>,

    /// Discord guild id.
    #[arg(long, env = "TOKENGATE_GUILD_ID", global = true)]
    pub guild_id: Option<String>,

    /// Concurrent sync workers.
    #[arg(long, env = "TOKENGATE_SYNC_WORKERS", global = true)]
    pub sync_workers: Option<usize>,
}

impl ConfigOverrides {
    /// Layer the overrides on top of `config`.
    pub fn apply(self, config: GateConfig) -> GateConfig {
        GateConfig {
            data_dir: self.data_dir.unwrap_or(config.data_dir),
            log_level: self.log_level.unwrap_or(config.log_level),
            log_format: self.log_format.unwrap_or(config.log_format),
            listen_addr: self.listen_addr.unwrap_or(config.listen_addr),
            community_name: self.community_name.unwrap_or(config.community_name),
            oracle_url: self.oracle_url.unwrap_or(config.oracle_url),
            guild_id: self.guild_id.unwrap_or(config.guild_id),
            sync_workers: self.sync_workers.unwrap_or(config.sync_workers),
            ..config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = GateConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = GateConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = GateConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.session_ttl_secs, 600);
        assert_eq!(config.oracle_page_limit, 1000);
        assert_eq!(config.oracle_max_pages, 10);
        assert_eq!(config.sync_workers, 4);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.discord_api_base, "https://discord.com/api/v10");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            community_name = "Bonk Holders"
            guild_id = "555"
            sync_interval_secs = 3600
            log_format = "json"
        "#;
        let config = GateConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.community_name, "Bonk Holders");
        assert_eq!(config.guild_id, "555");
        assert_eq!(config.sync_interval_secs, 3600);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.call_timeout_secs, 10); // default
    }

    #[test]
    fn token_in_file_is_ignored() {
        let config = GateConfig::from_toml_str(r#"discord_token = "leak""#).unwrap();
        assert!(!config.to_toml_string().unwrap().contains("leak"));
    }

    #[test]
    fn overrides_win_over_file() {
        let file = GateConfig::from_toml_str(r#"guild_id = "1"
sync_workers = 2"#)
        .unwrap();
        let merged = ConfigOverrides {
            guild_id: Some("2".into()),
            ..Default::default()
        }
        .apply(file);
        assert_eq!(merged.guild_id, "2");
        assert_eq!(merged.sync_workers, 2);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = GateConfig::from_toml_file(Path::new("/nonexistent/tokengate.toml"));
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }
}
