use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = ".launchgate/config.json";

/// Workspace configuration. Every field has a default so a partial file works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchgateConfig {
    pub store_path: String,
    pub approvers_cache_ttl_secs: u64,
    pub owners_freshness_secs: u64,
    pub http_timeout_secs: u64,
    pub http_connect_timeout_secs: u64,
    /// Longest response excerpt written to the log.
    pub max_log_line: usize,
    /// Users with blanket approval rights.
    pub admins: Vec<String>,
}

impl Default for LaunchgateConfig {
    fn default() -> Self {
        Self {
            store_path: ".launchgate/store.json".to_string(),
            approvers_cache_ttl_secs: 60 * 60,
            owners_freshness_secs: 60 * 60,
            http_timeout_secs: 30,
            http_connect_timeout_secs: 10,
            max_log_line: 1000,
            admins: Vec::new(),
        }
    }
}

impl LaunchgateConfig {
    /// Load config from `path`, or defaults when the file does not exist.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("cannot read config {path}"))?;
        serde_json::from_str(&content).with_context(|| format!("{path}: invalid config JSON"))
    }

    pub fn approvers_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.approvers_cache_ttl_secs)
    }

    /// Values past what chrono can represent saturate.
    pub fn owners_freshness(&self) -> chrono::Duration {
        i64::try_from(self.owners_freshness_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Truncate `text` to at most `max` characters for logging.
pub fn log_excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = std::env::temp_dir().join("launchgate-no-such-dir");
        let path = dir.join("config.json");
        let config = LaunchgateConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config, LaunchgateConfig::default());
        assert_eq!(config.approvers_cache_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config: LaunchgateConfig =
            serde_json::from_str(r#"{"admins": ["root@example.com"], "http_timeout_secs": 5}"#)
                .unwrap();
        assert_eq!(config.admins, vec!["root@example.com".to_string()]);
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(config.store_path, ".launchgate/store.json");
        assert_eq!(config.owners_freshness(), chrono::Duration::hours(1));
    }

    #[test]
    fn huge_freshness_saturates() {
        let config: LaunchgateConfig =
            serde_json::from_str(r#"{"owners_freshness_secs": 18446744073709551}"#).unwrap();
        assert_eq!(config.owners_freshness(), chrono::Duration::MAX);

        let config: LaunchgateConfig =
            serde_json::from_str(r#"{"owners_freshness_secs": 18446744073709551615}"#).unwrap();
        assert_eq!(config.owners_freshness(), chrono::Duration::MAX);

        let config: LaunchgateConfig =
            serde_json::from_str(r#"{"owners_freshness_secs": 0}"#).unwrap();
        assert_eq!(config.owners_freshness(), chrono::Duration::zero());
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(log_excerpt("abcdef", 3), "abc");
        assert_eq!(log_excerpt("ab", 3), "ab");
        assert_eq!(log_excerpt("ééé", 2), "éé");
    }
}
