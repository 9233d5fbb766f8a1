//! Concurrent multi-provider search.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use mirrorlens_core::types::Provider;
use thiserror::Error;
use tracing::{debug, warn};

use crate::client::CatalogApi;
use crate::normalize::normalize_search;
use crate::{FetchError, SearchHit};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("missing or empty search query")]
    EmptyQuery,
    #[error("provider not configured: {0}")]
    UnknownProvider(Provider),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AggregatedResult {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub count: usize,
}

/// Fans a query out to every configured catalog.
pub struct SearchAggregator {
    catalogs: Vec<Arc<dyn CatalogApi>>,
    timeout: Duration,
}

impl SearchAggregator {
    pub fn new(mut catalogs: Vec<Arc<dyn CatalogApi>>, timeout: Duration) -> Self {
        catalogs.sort_by_key(|c| c.provider());
        Self { catalogs, timeout }
    }

    /// Search every provider at once. A failing provider contributes no hits;
    /// the rest still come back, merged in provider order.
    pub async fn search(&self, query: &str) -> Result<AggregatedResult, SearchError> {
        validate_query(query)?;

        let per_provider = join_all(
            self.catalogs
                .iter()
                .map(|c| self.search_or_empty(c.as_ref(), query)),
        )
        .await;

        let mut seen = HashSet::new();
        let results: Vec<SearchHit> = per_provider
            .into_iter()
            .flatten()
            .filter(|hit| seen.insert((hit.provider, hit.id.clone())))
            .collect();

        Ok(AggregatedResult {
            query: query.to_string(),
            count: results.len(),
            results,
        })
    }

    /// Search one provider. Unlike [`Self::search`], failures are returned.
    pub async fn search_provider(
        &self,
        provider: Provider,
        query: &str,
    ) -> Result<Vec<SearchHit>, SearchError> {
        validate_query(query)?;
        let api = self
            .catalogs
            .iter()
            .find(|c| c.provider() == provider)
            .ok_or(SearchError::UnknownProvider(provider))?;

        let raw = self.bounded_search(api.as_ref(), query).await?;
        Ok(normalize_search(provider, &raw))
    }

    async fn bounded_search(
        &self,
        api: &dyn CatalogApi,
        query: &str,
    ) -> Result<serde_json::Value, FetchError> {
        tokio::time::timeout(self.timeout, api.search(query))
            .await
            .unwrap_or(Err(FetchError::Timeout))
    }

    async fn search_or_empty(&self, api: &dyn CatalogApi, query: &str) -> Vec<SearchHit> {
        let provider = api.provider();
        match self.bounded_search(api, query).await {
            Ok(raw) => {
                let hits = normalize_search(provider, &raw);
                debug!(provider = %provider, hits = hits.len(), "provider search done");
                hits
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "provider search failed, skipping");
                Vec::new()
            }
        }
    }
}

/// Blank queries are rejected; anything else is forwarded exactly as given.
fn validate_query(query: &str) -> Result<(), SearchError> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    Ok(())
}
