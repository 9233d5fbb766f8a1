use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use mirrorlens_core::types::Provider;
use mirrorlens_posters::store::PosterCacheStore;
use mirrorlens_providers::client::{CatalogApi, ProviderClient, build_http_client};
use mirrorlens_providers::search::SearchAggregator;
use mirrorlens_providers::token::{HttpHandshake, TokenCache};

use crate::config::ServerConfig;
use crate::notify::{LogNotifier, Notifier};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenCache>,
    pub clients: Arc<HashMap<Provider, Arc<ProviderClient>>>,
    pub search: Arc<SearchAggregator>,
    pub posters: Arc<PosterCacheStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Wire one client per provider around a single shared token cache.
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let upstream = &config.upstream;
        let http = build_http_client(upstream.timeout).context("failed to build HTTP client")?;

        let tokens = Arc::new(TokenCache::new(
            Arc::new(HttpHandshake::new(http.clone(), upstream)),
            upstream.token_ttl,
        ));

        let clients: HashMap<Provider, Arc<ProviderClient>> = Provider::ALL
            .into_iter()
            .map(|p| {
                let client = ProviderClient::new(p, http.clone(), upstream.clone(), tokens.clone());
                (p, Arc::new(client))
            })
            .collect();

        let catalogs: Vec<Arc<dyn CatalogApi>> = clients
            .values()
            .map(|c| c.clone() as Arc<dyn CatalogApi>)
            .collect();
        let search = Arc::new(SearchAggregator::new(catalogs, upstream.timeout));

        Ok(Self {
            tokens,
            clients: Arc::new(clients),
            search,
            posters: Arc::new(PosterCacheStore::new(config.poster_cache_path())),
            notifier: Arc::new(LogNotifier),
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn client(&self, provider: Provider) -> Option<&Arc<ProviderClient>> {
        self.clients.get(&provider)
    }
}
