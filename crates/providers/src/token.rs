//! Session credential cache.
//!
//! Two of the upstreams want a `t_hash` session cookie replayed verbatim. The
//! cookie comes from a handshake endpoint and stays valid for a fixed TTL.
//! Refreshes are single-flighted: callers that find the credential missing or
//! stale while a handshake is running await that same handshake and all see
//! its outcome.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::AuthError;
use crate::config::{DESKTOP_USER_AGENT, HTML_ACCEPT, TOKEN_MARKER, UpstreamConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Entire raw `Set-Cookie` value, replayed as the `Cookie` request header.
    pub value: String,
    pub issued_at: Instant,
    pub ttl: Duration,
}

impl Credential {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) < self.ttl
    }
}

/// Source of fresh credential values.
#[async_trait::async_trait]
pub trait Handshake: Send + Sync {
    async fn fetch_credential(&self) -> Result<String, AuthError>;
}

/// Handshake against the upstream cookie-issuing page.
pub struct HttpHandshake {
    client: reqwest::Client,
    url: String,
}

impl HttpHandshake {
    pub fn new(client: reqwest::Client, upstream: &UpstreamConfig) -> Self {
        Self {
            client,
            url: upstream.token_url(),
        }
    }
}

#[async_trait::async_trait]
impl Handshake for HttpHandshake {
    async fn fetch_credential(&self) -> Result<String, AuthError> {
        debug!(url = %self.url, "credential handshake");

        let resp = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, DESKTOP_USER_AGENT)
            .header(reqwest::header::ACCEPT, HTML_ACCEPT)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(format!("handshake failed: {e}")))?;

        let cookies = resp.headers().get_all(reqwest::header::SET_COOKIE);
        let mut seen = 0usize;
        for value in cookies.iter() {
            seen += 1;
            if let Ok(raw) = value.to_str() {
                if raw.contains(TOKEN_MARKER) {
                    return Ok(raw.to_string());
                }
            }
        }

        Err(AuthError::Unavailable(format!(
            "no {TOKEN_MARKER} cookie among {seen} Set-Cookie headers"
        )))
    }
}

type InFlight = Shared<BoxFuture<'static, Result<Credential, AuthError>>>;

#[derive(Default)]
struct CacheState {
    current: Option<Credential>,
    in_flight: Option<InFlight>,
}

/// Holds at most one credential and refreshes it on expiry.
///
/// The internal lock is never held across an await.
pub struct TokenCache {
    handshake: Arc<dyn Handshake>,
    ttl: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl TokenCache {
    pub fn new(handshake: Arc<dyn Handshake>, ttl: Duration) -> Self {
        Self {
            handshake,
            ttl,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Return the cached credential if still fresh, otherwise join or start a refresh.
    pub async fn get_token(&self) -> Result<Credential, AuthError> {
        let refresh = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(cred) = &state.current {
                if cred.is_fresh(Instant::now()) {
                    return Ok(cred.clone());
                }
            }
            match &state.in_flight {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.start_refresh();
                    state.in_flight = Some(pending.clone());
                    pending
                }
            }
        };
        refresh.await
    }

    /// Fresh cached credential, without ever triggering a handshake.
    pub fn cached(&self) -> Option<Credential> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .current
            .as_ref()
            .filter(|c| c.is_fresh(Instant::now()))
            .cloned()
    }

    fn start_refresh(&self) -> InFlight {
        let handshake = Arc::clone(&self.handshake);
        let state = Arc::clone(&self.state);
        let ttl = self.ttl;

        async move {
            let result = handshake
                .fetch_credential()
                .await
                .map(|value| Credential {
                    value,
                    issued_at: Instant::now(),
                    ttl,
                });

            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight = None;
            match &result {
                Ok(cred) => {
                    info!(len = cred.value.len(), ttl_secs = ttl.as_secs(), "credential refreshed");
                    state.current = Some(cred.clone());
                }
                Err(e) => warn!(error = %e, "credential refresh failed"),
            }
            result
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandshake {
        calls: AtomicUsize,
        succeed: bool,
    }

    impl CountingHandshake {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                succeed,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Handshake for CountingHandshake {
        async fn fetch_credential(&self) -> Result<String, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.succeed {
                Ok(format!("t_hash=abc{n}; Path=/; HttpOnly"))
            } else {
                Err(AuthError::Unavailable("no cookie".into()))
            }
        }
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_handshake() {
        let hs = CountingHandshake::new(true);
        let cache = TokenCache::new(hs.clone(), HOUR);

        let results = futures::future::join_all((0..8).map(|_| cache.get_token())).await;

        assert_eq!(hs.calls(), 1);
        let first = results[0].clone().unwrap();
        assert!(results.iter().all(|r| r.as_ref() == Ok(&first)));
        assert_eq!(first.value, "t_hash=abc1; Path=/; HttpOnly");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_a_failed_handshake() {
        let hs = CountingHandshake::new(false);
        let cache = TokenCache::new(hs.clone(), HOUR);

        let results = futures::future::join_all((0..5).map(|_| cache.get_token())).await;

        assert_eq!(hs.calls(), 1);
        assert!(results.iter().all(|r| matches!(r, Err(AuthError::Unavailable(_)))));
        assert!(cache.cached().is_none());

        // failures are not cached; the next caller retries
        let _ = cache.get_token().await;
        assert_eq!(hs.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn credential_is_reused_until_ttl_elapses() {
        let hs = CountingHandshake::new(true);
        let cache = TokenCache::new(hs.clone(), HOUR);

        let first = cache.get_token().await.unwrap();
        assert_eq!(hs.calls(), 1);

        tokio::time::advance(Duration::from_secs(59 * 60)).await;
        let again = cache.get_token().await.unwrap();
        assert_eq!(hs.calls(), 1);
        assert_eq!(again, first);

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert!(cache.cached().is_none());
        let refreshed = cache.get_token().await.unwrap();
        assert_eq!(hs.calls(), 2);
        assert_ne!(refreshed.value, first.value);
    }

    #[tokio::test]
    async fn http_handshake_keeps_the_whole_cookie_header() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/p.php"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "PHPSESSID=zzz; Path=/")
                    .append_header("set-cookie", "t_hash=deadbeef; expires=Tue, 01 Jan 2030 00:00:00 GMT; Path=/"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let hs = HttpHandshake::new(reqwest::Client::new(), &UpstreamConfig::with_base_url(&server.uri()));
        let value = hs.fetch_credential().await.unwrap();
        assert_eq!(value, "t_hash=deadbeef; expires=Tue, 01 Jan 2030 00:00:00 GMT; Path=/");
    }

    #[tokio::test]
    async fn http_handshake_without_marker_is_unavailable() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).append_header("set-cookie", "other=1"))
            .mount(&server)
            .await;

        let hs = HttpHandshake::new(reqwest::Client::new(), &UpstreamConfig::with_base_url(&server.uri()));
        assert!(matches!(hs.fetch_credential().await, Err(AuthError::Unavailable(_))));
    }
}
