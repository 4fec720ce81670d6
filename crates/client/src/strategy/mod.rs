//! Strategy executors.
//!
//! A network response is successful when its status is 2xx. Transport errors
//! are network failures. A non-2xx response is never stored; the executor
//! tries its cache fallback and otherwise hands the response back as is.
//!
//! The cache is an optimization: read failures count as a miss and write
//! failures are logged, neither fails the request.

pub mod offline;

use std::sync::Arc;

use harbor_core::{AgentRequest, AgentResponse, Cache, CachePurpose, CacheStorage, Error};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::background::Background;
use crate::fetch::Transport;
use crate::lifecycle::Generations;
use crate::route::Strategy;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Network,
    Cache,
    /// Synthesized by the offline responder.
    Offline,
}

/// A response plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: AgentResponse,
    pub source: Source,
}

impl Served {
    fn network(response: AgentResponse) -> Self {
        Self { response, source: Source::Network }
    }

    fn cache(response: AgentResponse) -> Self {
        Self { response, source: Source::Cache }
    }
}

/// Read from a generation, treating store failures as a miss.
async fn lookup(cache: &Cache, request: &AgentRequest) -> Option<AgentResponse> {
    match cache.match_request(request).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(generation = cache.name(), url = %request.url, "cache read failed: {e}");
            None
        }
    }
}

/// Write a successful response, trimming the dynamic generation afterwards.
pub(crate) async fn store(cache: &Cache, limit: Option<usize>, request: &AgentRequest, response: &AgentResponse) {
    if let Err(e) = cache.put(request, response).await {
        tracing::warn!(generation = cache.name(), url = %request.url, "cache write failed: {e}");
        return;
    }
    if let Some(max_entries) = limit {
        match cache.trim(max_entries).await {
            Ok(0) => {}
            Ok(trimmed) => tracing::debug!(generation = cache.name(), trimmed, "trimmed generation"),
            Err(e) => tracing::warn!(generation = cache.name(), "cache trim failed: {e}"),
        }
    }
}

/// Runs a [`Strategy`] against the transport and the current generations.
pub struct Executor {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn CacheStorage>,
    generations: Generations,
    background: Arc<Background>,
    dynamic_max_entries: usize,
    root: Url,
}

impl Executor {
    pub fn new(
        transport: Arc<dyn Transport>, storage: Arc<dyn CacheStorage>, generations: Generations,
        background: Arc<Background>, dynamic_max_entries: usize, origin: &Url,
    ) -> Self {
        let mut root = origin.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        Self { transport, storage, generations, background, dynamic_max_entries, root }
    }

    fn cache(&self, purpose: CachePurpose) -> Cache {
        Cache::handle(self.storage.clone(), self.generations.name(purpose))
    }

    fn limit(&self, purpose: CachePurpose) -> Option<usize> {
        (purpose == CachePurpose::Dynamic).then_some(self.dynamic_max_entries)
    }

    /// The root document request used as the navigation fallback.
    pub fn root_request(&self) -> AgentRequest {
        AgentRequest::navigate(self.root.clone())
    }

    /// Look a request up in the dynamic generation, then the static one.
    pub async fn match_any(&self, request: &AgentRequest) -> Option<AgentResponse> {
        for purpose in [CachePurpose::Dynamic, CachePurpose::Static] {
            if let Some(found) = lookup(&self.cache(purpose), request).await {
                return Some(found);
            }
        }
        None
    }

    pub async fn execute(&self, strategy: Strategy, request: &AgentRequest) -> Result<Served, Error> {
        tracing::debug!(%strategy, url = %request.url, "executing strategy");
        match strategy {
            Strategy::CacheFirst(purpose) => self.cache_first(purpose, request).await,
            Strategy::NetworkFirst(purpose) => self.network_first(purpose, request).await,
            Strategy::NetworkOnly => self.network_only(request).await,
            Strategy::Navigation => self.navigation(request).await,
        }
    }

    /// Cached entry if present, revalidated in the background; else network.
    pub async fn cache_first(&self, purpose: CachePurpose, request: &AgentRequest) -> Result<Served, Error> {
        let cache = self.cache(purpose);

        if let Some(cached) = lookup(&cache, request).await {
            tracing::debug!(url = %request.url, "cache hit");
            self.revalidate(cache, purpose, request.clone());
            return Ok(Served::cache(cached));
        }

        let response = self.transport.fetch(request).await?;
        if response.is_success() {
            store(&cache, self.limit(purpose), request, &response).await;
        }
        Ok(Served::network(response))
    }

    /// Detached fetch-and-store for a cache hit. Errors are only logged.
    fn revalidate(&self, cache: Cache, purpose: CachePurpose, request: AgentRequest) {
        let transport = self.transport.clone();
        let limit = self.limit(purpose);
        self.background.spawn("revalidate", async move {
            let response = transport.fetch(&request).await?;
            if response.is_success() {
                store(&cache, limit, &request, &response).await;
            } else {
                tracing::debug!(url = %request.url, status = response.status, "revalidation kept stale entry");
            }
            Ok(())
        });
    }

    /// Network, storing successes; fall back to the cached entry.
    pub async fn network_first(&self, purpose: CachePurpose, request: &AgentRequest) -> Result<Served, Error> {
        let cache = self.cache(purpose);

        match self.transport.fetch(request).await {
            Ok(response) if response.is_success() => {
                store(&cache, self.limit(purpose), request, &response).await;
                Ok(Served::network(response))
            }
            Ok(response) => match lookup(&cache, request).await {
                Some(cached) => {
                    tracing::debug!(url = %request.url, status = response.status, "serving cached entry over error status");
                    Ok(Served::cache(cached))
                }
                None => Ok(Served::network(response)),
            },
            Err(e) => match lookup(&cache, request).await {
                Some(cached) => {
                    tracing::debug!(url = %request.url, "network failed, serving cached entry");
                    Ok(Served::cache(cached))
                }
                None => Err(e),
            },
        }
    }

    pub async fn network_only(&self, request: &AgentRequest) -> Result<Served, Error> {
        Ok(Served::network(self.transport.fetch(request).await?))
    }

    /// Network-first for documents, stored in the dynamic generation, with
    /// the exact cached page and then the cached root document as fallbacks.
    pub async fn navigation(&self, request: &AgentRequest) -> Result<Served, Error> {
        let dynamic = self.cache(CachePurpose::Dynamic);

        match self.transport.fetch(request).await {
            Ok(response) if response.is_success() => {
                store(&dynamic, self.limit(CachePurpose::Dynamic), request, &response).await;
                Ok(Served::network(response))
            }
            Ok(response) => Ok(self.match_any(request).await.map_or_else(|| Served::network(response), Served::cache)),
            Err(e) => {
                if let Some(page) = self.match_any(request).await {
                    tracing::debug!(url = %request.url, "network failed, serving cached page");
                    return Ok(Served::cache(page));
                }
                if let Some(root) = self.match_any(&self.root_request()).await {
                    tracing::debug!(url = %request.url, "network failed, serving cached root document");
                    return Ok(Served::cache(root));
                }
                Err(e)
            }
        }
    }
}
