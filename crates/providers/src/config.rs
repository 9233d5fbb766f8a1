//! Per-provider upstream conventions.
//!
//! Every provider difference (paths, query-parameter names, headers, count
//! field synonyms, poster template) lives in a [`ProviderConfig`] row. Adding
//! a provider means adding a row here, not a new code path.

use std::time::Duration;

use mirrorlens_core::types::Provider;

pub const DEFAULT_API_BASE: &str = "https://net20.cc";
pub const DEFAULT_EPISODES_BASE: &str = "https://net51.cc";

/// Handshake endpoint that issues the session cookie (on the episodes host).
pub const TOKEN_PATH: &str = "/tv/p.php";
/// Substring identifying the session cookie among `Set-Cookie` values.
pub const TOKEN_MARKER: &str = "t_hash=";
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 5 Build/TQ3A.230901.001; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/139.0.7258.158 Safari/537.36 /OS.Gatu v3.0";
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const JSON_ACCEPT: &str = "application/json";

const POSTER_PROXY: &str = "https://wsrv.nl/?url=https://imgcdn.kim";
const POSTER_WIDTH: u32 = 500;

/// Season fields that may carry an episode count, checked in order.
const SHARED_COUNT_FIELDS: &[&str] = &[
    "ep_count",
    "total_episodes",
    "episode_count",
    "eps",
    "epCount",
    "episodes_count",
    "episode_count_total",
    "totalEpisodes",
    "count",
];

/// Which optional headers a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPolicy {
    /// Replay the session cookie when one is available.
    pub credential: bool,
    /// Send `Referer: {episodes_base}/`.
    pub referer: bool,
}

impl HeaderPolicy {
    pub const NONE: Self = Self {
        credential: false,
        referer: false,
    };
    pub const ALL: Self = Self {
        credential: true,
        referer: true,
    };
}

#[derive(Debug)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub detail_path: &'static str,
    pub detail_param: &'static str,
    pub search_path: &'static str,
    pub search_param: &'static str,
    pub episodes_path: &'static str,
    pub season_param: &'static str,
    pub series_param: &'static str,
    /// Poster feed on the episodes host, for providers that publish one.
    pub homepage_path: Option<&'static str>,
    /// Path segment of the poster image under the image CDN.
    pub image_path: &'static str,
    /// Headers for detail, search and homepage requests.
    pub catalog_headers: HeaderPolicy,
    /// Headers for episode-list requests, which every provider authenticates.
    pub episodes_headers: HeaderPolicy,
    pub accept_language: &'static str,
    /// Provider-specific count synonyms, checked after the shared ones.
    pub extra_count_fields: &'static [&'static str],
}

static PROVIDERS: [ProviderConfig; 3] = [
    ProviderConfig {
        provider: Provider::Netflix,
        detail_path: "/post.php",
        detail_param: "id",
        search_path: "/search.php",
        search_param: "s",
        episodes_path: "/episodes.php",
        season_param: "s",
        series_param: "series",
        homepage_path: None,
        image_path: "poster/v",
        catalog_headers: HeaderPolicy::NONE,
        episodes_headers: HeaderPolicy::ALL,
        accept_language: "en-US,en;q=0.9",
        extra_count_fields: &["ep"],
    },
    ProviderConfig {
        provider: Provider::AmazonPrime,
        detail_path: "/pv/post.php",
        detail_param: "id",
        search_path: "/pv/search.php",
        search_param: "s",
        episodes_path: "/pv/episodes.php",
        season_param: "s",
        series_param: "series",
        homepage_path: Some("/tv/pv/homepage.php"),
        image_path: "pv/v",
        catalog_headers: HeaderPolicy::ALL,
        episodes_headers: HeaderPolicy::ALL,
        accept_language: "en-IN,en-US;q=0.9,en;q=0.8",
        extra_count_fields: &[],
    },
    ProviderConfig {
        provider: Provider::JioHotstar,
        detail_path: "/mobile/hs/post.php",
        detail_param: "id",
        search_path: "/mobile/hs/search.php",
        search_param: "s",
        episodes_path: "/mobile/hs/episodes.php",
        season_param: "s",
        series_param: "series",
        homepage_path: None,
        image_path: "hs/v",
        catalog_headers: HeaderPolicy {
            credential: true,
            referer: false,
        },
        episodes_headers: HeaderPolicy::ALL,
        accept_language: "en-US,en;q=0.9",
        extra_count_fields: &[],
    },
];

pub fn provider_config(provider: Provider) -> &'static ProviderConfig {
    PROVIDERS
        .iter()
        .find(|c| c.provider == provider)
        .unwrap_or(&PROVIDERS[0])
}

impl ProviderConfig {
    pub fn count_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        SHARED_COUNT_FIELDS
            .iter()
            .chain(self.extra_count_fields.iter())
            .copied()
    }

    /// Poster URL for a content id. Always synthesized, never taken from upstream.
    pub fn poster_url(&self, id: &str) -> String {
        format!(
            "{POSTER_PROXY}/{}/{}.jpg&w={POSTER_WIDTH}",
            self.image_path,
            urlencoding::encode(id)
        )
    }
}

/// Runtime-overridable upstream settings shared by every provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub api_base: String,
    pub episodes_base: String,
    pub timeout: Duration,
    pub token_ttl: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            episodes_base: DEFAULT_EPISODES_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

impl UpstreamConfig {
    /// Point both upstream hosts at one base URL.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            api_base: base.clone(),
            episodes_base: base,
            ..Default::default()
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.episodes_base)
    }

    pub fn detail_url(&self, cfg: &ProviderConfig) -> String {
        format!("{}{}", self.api_base, cfg.detail_path)
    }

    pub fn search_url(&self, cfg: &ProviderConfig) -> String {
        format!("{}{}", self.api_base, cfg.search_path)
    }

    pub fn episodes_url(&self, cfg: &ProviderConfig) -> String {
        format!("{}{}", self.episodes_base, cfg.episodes_path)
    }

    pub fn homepage_url(&self, cfg: &ProviderConfig) -> Option<String> {
        cfg.homepage_path
            .map(|p| format!("{}{p}", self.episodes_base))
    }

    pub fn referer(&self) -> String {
        format!("{}/", self.episodes_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_has_a_row() {
        for p in Provider::ALL {
            assert_eq!(provider_config(p).provider, p);
        }
    }

    #[test]
    fn poster_url_is_built_from_id() {
        let cfg = provider_config(Provider::AmazonPrime);
        assert_eq!(
            cfg.poster_url("0QK8 X"),
            "https://wsrv.nl/?url=https://imgcdn.kim/pv/v/0QK8%20X.jpg&w=500"
        );
        assert!(provider_config(Provider::Netflix).poster_url("1").contains("/poster/v/1.jpg"));
    }

    #[test]
    fn extra_count_fields_come_after_shared_ones() {
        let fields: Vec<_> = provider_config(Provider::Netflix).count_fields().collect();
        assert_eq!(fields.first(), Some(&"ep_count"));
        assert_eq!(fields.last(), Some(&"ep"));
        assert!(!provider_config(Provider::AmazonPrime).count_fields().any(|f| f == "ep"));
    }

    #[test]
    fn episode_requests_always_authenticate() {
        for p in Provider::ALL {
            assert_eq!(provider_config(p).episodes_headers, HeaderPolicy::ALL, "{p}");
        }
        assert_eq!(provider_config(Provider::Netflix).catalog_headers, HeaderPolicy::NONE);
    }

    #[test]
    fn rebased_urls() {
        let up = UpstreamConfig::with_base_url("http://127.0.0.1:9000/");
        let cfg = provider_config(Provider::JioHotstar);
        assert_eq!(up.detail_url(cfg), "http://127.0.0.1:9000/mobile/hs/post.php");
        assert_eq!(up.episodes_url(cfg), "http://127.0.0.1:9000/mobile/hs/episodes.php");
        assert_eq!(up.token_url(), "http://127.0.0.1:9000/tv/p.php");
        assert_eq!(up.homepage_url(cfg), None);
    }
}
