//! Environment-driven server configuration.

use std::path::PathBuf;
use std::time::Duration;

use mirrorlens_providers::config::{
    DEFAULT_API_BASE, DEFAULT_EPISODES_BASE, DEFAULT_TIMEOUT, DEFAULT_TOKEN_TTL, UpstreamConfig,
};
use tracing::warn;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const POSTER_CACHE_FILE: &str = "posters-cache.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub data_dir: PathBuf,
    pub upstream: UpstreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            data_dir: DEFAULT_DATA_DIR.into(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let secs = |key: &str, default: Duration| match lookup(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => Duration::from_secs(n),
                _ => {
                    warn!(key, value = %raw, default_secs = default.as_secs(), "invalid duration, using default");
                    default
                }
            },
        };

        Self {
            bind: text("MIRRORLENS_BIND", DEFAULT_BIND),
            data_dir: text("MIRRORLENS_DATA_DIR", DEFAULT_DATA_DIR).into(),
            upstream: UpstreamConfig {
                api_base: trim_base(text("MIRRORLENS_API_BASE", DEFAULT_API_BASE)),
                episodes_base: trim_base(text("MIRRORLENS_EPISODES_BASE", DEFAULT_EPISODES_BASE)),
                timeout: secs("MIRRORLENS_UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT),
                token_ttl: secs("MIRRORLENS_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL),
            },
        }
    }

    /// `MIRRORLENS_LOG_JSON=1` selects JSON log lines. Read before the
    /// subscriber exists, so it cannot go through [`Self::from_env`].
    pub fn log_json_from_env() -> bool {
        std::env::var("MIRRORLENS_LOG_JSON").is_ok_and(|v| v.trim() == "1")
    }

    pub fn poster_cache_path(&self) -> PathBuf {
        self.data_dir.join(POSTER_CACHE_FILE)
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(from_pairs(&[]), ServerConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from_pairs(&[
            ("MIRRORLENS_BIND", "127.0.0.1:9000"),
            ("MIRRORLENS_DATA_DIR", "/var/lib/mirrorlens"),
            ("MIRRORLENS_API_BASE", "http://localhost:1234/"),
            ("MIRRORLENS_UPSTREAM_TIMEOUT_SECS", "3"),
            ("MIRRORLENS_TOKEN_TTL_SECS", "60"),
        ]);
        assert_eq!(cfg.bind, "127.0.0.1:9000");
        assert_eq!(
            cfg.poster_cache_path(),
            PathBuf::from("/var/lib/mirrorlens/posters-cache.json")
        );
        assert_eq!(cfg.upstream.api_base, "http://localhost:1234");
        assert_eq!(cfg.upstream.episodes_base, DEFAULT_EPISODES_BASE);
        assert_eq!(cfg.upstream.timeout, Duration::from_secs(3));
        assert_eq!(cfg.upstream.token_ttl, Duration::from_secs(60));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = from_pairs(&[
            ("MIRRORLENS_UPSTREAM_TIMEOUT_SECS", "soon"),
            ("MIRRORLENS_TOKEN_TTL_SECS", "0"),
        ]);
        assert_eq!(cfg.upstream.timeout, DEFAULT_TIMEOUT);
        assert_eq!(cfg.upstream.token_ttl, DEFAULT_TOKEN_TTL);
    }
}
