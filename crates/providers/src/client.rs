//! Authenticated HTTP access to one upstream catalog.

use std::sync::Arc;
use std::time::Duration;

use mirrorlens_core::types::Provider;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::FetchError;
use crate::config::{
    DESKTOP_USER_AGENT, HeaderPolicy, JSON_ACCEPT, ProviderConfig, UpstreamConfig,
    provider_config,
};
use crate::token::TokenCache;

/// Raw access to a catalog's detail, search and episode endpoints.
#[async_trait::async_trait]
pub trait CatalogApi: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch_detail(&self, id: &str) -> Result<Value, FetchError>;

    async fn search(&self, query: &str) -> Result<Value, FetchError>;

    async fn fetch_episodes(&self, series_id: &str, season_id: &str)
    -> Result<Value, FetchError>;
}

pub struct ProviderClient {
    config: &'static ProviderConfig,
    upstream: UpstreamConfig,
    client: reqwest::Client,
    tokens: Arc<TokenCache>,
}

impl ProviderClient {
    pub fn new(
        provider: Provider,
        client: reqwest::Client,
        upstream: UpstreamConfig,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            config: provider_config(provider),
            upstream,
            client,
            tokens,
        }
    }

    pub fn config(&self) -> &'static ProviderConfig {
        self.config
    }

    /// GET a JSON document from the provider's poster feed, if it publishes one.
    pub async fn fetch_homepage(&self, user_agent: &str) -> Option<Result<Value, FetchError>> {
        let url = self.upstream.homepage_url(self.config)?;
        Some(
            self.get_json(&url, &[], user_agent, self.config.catalog_headers)
                .await,
        )
    }

    async fn credential(&self) -> Option<String> {
        match self.tokens.get_token().await {
            Ok(cred) => Some(cred.value),
            Err(e) => {
                debug!(provider = %self.config.provider, error = %e, "proceeding without credential");
                None
            }
        }
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
        user_agent: &str,
        headers: HeaderPolicy,
    ) -> Result<Value, FetchError> {
        debug!(provider = %self.config.provider, url = %url, ?params, "upstream request");

        let mut req = self
            .client
            .get(url)
            .query(params)
            .timeout(self.upstream.timeout)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, JSON_ACCEPT)
            .header(ACCEPT_LANGUAGE, self.config.accept_language);
        if headers.referer {
            req = req.header(REFERER, self.upstream.referer());
        }
        if headers.credential {
            if let Some(cookie) = self.credential().await {
                req = req.header(COOKIE, cookie);
            }
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let text = resp.text().await?;
        parse_body(&text)
    }
}

#[async_trait::async_trait]
impl CatalogApi for ProviderClient {
    fn provider(&self) -> Provider {
        self.config.provider
    }

    async fn fetch_detail(&self, id: &str) -> Result<Value, FetchError> {
        let url = self.upstream.detail_url(self.config);
        let params = [(self.config.detail_param, id)];
        self.get_json(&url, &params, DESKTOP_USER_AGENT, self.config.catalog_headers)
            .await
    }

    async fn search(&self, query: &str) -> Result<Value, FetchError> {
        let url = self.upstream.search_url(self.config);
        let params = [(self.config.search_param, query)];
        self.get_json(&url, &params, DESKTOP_USER_AGENT, self.config.catalog_headers)
            .await
    }

    async fn fetch_episodes(
        &self,
        series_id: &str,
        season_id: &str,
    ) -> Result<Value, FetchError> {
        let url = self.upstream.episodes_url(self.config);
        let params = [
            (self.config.season_param, season_id),
            (self.config.series_param, series_id),
        ];
        self.get_json(&url, &params, DESKTOP_USER_AGENT, self.config.episodes_headers)
            .await
    }
}

/// Interpret an upstream body as untrusted JSON text.
pub fn parse_body(text: &str) -> Result<Value, FetchError> {
    if text.trim().is_empty() {
        return Err(FetchError::EmptyBody);
    }
    serde_json::from_str(text).map_err(|e| FetchError::MalformedJson(e.to_string()))
}

/// Shared reqwest client for every upstream call.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthError;
    use crate::token::Handshake;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    struct FixedHandshake(Option<&'static str>);

    #[async_trait::async_trait]
    impl Handshake for FixedHandshake {
        async fn fetch_credential(&self) -> Result<String, AuthError> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| AuthError::Unavailable("none".into()))
        }
    }

    fn client_for(server: &MockServer, provider: Provider, cookie: Option<&'static str>) -> ProviderClient {
        let upstream = UpstreamConfig {
            timeout: Duration::from_millis(500),
            ..UpstreamConfig::with_base_url(&server.uri())
        };
        let tokens = Arc::new(TokenCache::new(
            Arc::new(FixedHandshake(cookie)),
            Duration::from_secs(3600),
        ));
        ProviderClient::new(provider, reqwest::Client::new(), upstream, tokens)
    }

    #[test]
    fn parse_body_classifies_failures() {
        assert_eq!(parse_body("  \n"), Err(FetchError::EmptyBody));
        assert!(matches!(parse_body("<html>"), Err(FetchError::MalformedJson(_))));
        assert_eq!(parse_body(r#"{"a":1}"#).unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn detail_request_replays_cookie_for_credentialed_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pv/post.php"))
            .and(query_param("id", "0ABC"))
            .and(header("cookie", "t_hash=xyz; Path=/"))
            .and(header("referer", format!("{}/", server.uri()).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"title":"Dune"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::AmazonPrime, Some("t_hash=xyz; Path=/"));
        let raw = client.fetch_detail("0ABC").await.unwrap();
        assert_eq!(raw["title"], "Dune");
    }

    #[tokio::test]
    async fn anonymous_provider_sends_no_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.php"))
            .and(query_param("s", "dark"))
            .respond_with(|req: &Request| {
                if req.headers.contains_key("cookie") {
                    ResponseTemplate::new(400)
                } else {
                    ResponseTemplate::new(200).set_body_string(r#"{"searchResult":[]}"#)
                }
            })
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::Netflix, Some("t_hash=xyz"));
        assert!(client.search("dark").await.is_ok());
    }

    #[tokio::test]
    async fn episode_requests_carry_cookie_and_referer_for_every_provider() {
        for provider in Provider::ALL {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"episodes":[]}"#))
                .mount(&server)
                .await;

            let client = client_for(&server, provider, Some("t_hash=xyz; Path=/"));
            client.fetch_episodes("X", "S1").await.unwrap();

            let received = server.received_requests().await.unwrap();
            assert_eq!(received.len(), 1, "{provider}");
            let req = &received[0];
            assert_eq!(
                req.headers.get("cookie").unwrap().to_str().unwrap(),
                "t_hash=xyz; Path=/",
                "{provider}"
            );
            assert_eq!(
                req.headers.get("referer").unwrap().to_str().unwrap(),
                format!("{}/", server.uri()),
                "{provider}"
            );
        }
    }

    #[tokio::test]
    async fn missing_credential_does_not_block_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mobile/hs/episodes.php"))
            .and(query_param("s", "S1"))
            .and(query_param("series", "X9"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"episodes":[{"id":"e1"}]}"#))
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::JioHotstar, None);
        let raw = client.fetch_episodes("X9", "S1").await.unwrap();
        assert_eq!(raw["episodes"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_failures_are_distinct() {
        let server = MockServer::start().await;
        Mock::given(path("/post.php"))
            .and(query_param("id", "500"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(path("/post.php"))
            .and(query_param("id", "empty"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(path("/post.php"))
            .and(query_param("id", "html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
            .mount(&server)
            .await;
        Mock::given(path("/post.php"))
            .and(query_param("id", "slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Provider::Netflix, None);
        assert_eq!(client.fetch_detail("500").await, Err(FetchError::HttpStatus(503)));
        assert_eq!(client.fetch_detail("empty").await, Err(FetchError::EmptyBody));
        assert!(matches!(client.fetch_detail("html").await, Err(FetchError::MalformedJson(_))));
        assert_eq!(client.fetch_detail("slow").await, Err(FetchError::Timeout));
    }

    #[tokio::test]
    async fn homepage_only_for_providers_with_a_feed() {
        let server = MockServer::start().await;
        Mock::given(path("/tv/pv/homepage.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"post":[]}"#))
            .mount(&server)
            .await;

        let prime = client_for(&server, Provider::AmazonPrime, None);
        assert!(prime.fetch_homepage(DESKTOP_USER_AGENT).await.unwrap().is_ok());

        let netflix = client_for(&server, Provider::Netflix, None);
        assert!(netflix.fetch_homepage(DESKTOP_USER_AGENT).await.is_none());
    }
}
