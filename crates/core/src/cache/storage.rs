//! The cache store seam used by the agent.
//!
//! Executors and the lifecycle controller only ever talk to a
//! [`CacheStorage`]; [`CacheDb`] is the SQLite-backed implementation.

use std::sync::Arc;

use super::connection::CacheDb;
use super::entries::CacheKey;
use super::generations::{CacheGeneration, CachePurpose};
use crate::Error;
use crate::http::{AgentRequest, AgentResponse};

/// Named, versioned request to response stores.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the generation if needed.
    async fn open(&self, name: &str, purpose: CachePurpose, created_at_install: bool) -> Result<(), Error>;

    /// Every generation currently present, including foreign ones.
    async fn generations(&self) -> Result<Vec<CacheGeneration>, Error>;

    /// Drop a generation with its entries. False if it did not exist.
    async fn delete_generation(&self, name: &str) -> Result<bool, Error>;

    async fn lookup(&self, generation: &str, request: &AgentRequest) -> Result<Option<AgentResponse>, Error>;

    async fn store(&self, generation: &str, request: &AgentRequest, response: &AgentResponse) -> Result<(), Error>;

    /// Store a batch atomically.
    async fn store_all(&self, generation: &str, entries: &[(AgentRequest, AgentResponse)]) -> Result<(), Error>;

    async fn evict(&self, generation: &str, request: &AgentRequest) -> Result<bool, Error>;

    async fn keys(&self, generation: &str) -> Result<Vec<CacheKey>, Error>;

    /// Drop the oldest entries beyond `max_entries`.
    async fn trim(&self, generation: &str, max_entries: usize) -> Result<u64, Error>;

    /// Drop every entry, keep the generation.
    async fn clear(&self, generation: &str) -> Result<u64, Error>;
}

#[async_trait::async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str, purpose: CachePurpose, created_at_install: bool) -> Result<(), Error> {
        self.open_generation(name, purpose, created_at_install).await
    }

    async fn generations(&self) -> Result<Vec<CacheGeneration>, Error> {
        self.list_generations().await
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        CacheDb::delete_generation(self, name).await
    }

    async fn lookup(&self, generation: &str, request: &AgentRequest) -> Result<Option<AgentResponse>, Error> {
        self.match_entry(generation, request.method, &request.url).await
    }

    async fn store(&self, generation: &str, request: &AgentRequest, response: &AgentResponse) -> Result<(), Error> {
        self.put_entry(generation, request, response).await
    }

    async fn store_all(&self, generation: &str, entries: &[(AgentRequest, AgentResponse)]) -> Result<(), Error> {
        self.put_entries(generation, entries).await
    }

    async fn evict(&self, generation: &str, request: &AgentRequest) -> Result<bool, Error> {
        self.delete_entry(generation, request.method, &request.url).await
    }

    async fn keys(&self, generation: &str) -> Result<Vec<CacheKey>, Error> {
        self.entry_keys(generation).await
    }

    async fn trim(&self, generation: &str, max_entries: usize) -> Result<u64, Error> {
        self.trim_generation(generation, max_entries).await
    }

    async fn clear(&self, generation: &str) -> Result<u64, Error> {
        self.clear_generation(generation).await
    }
}

/// Handle to one open generation.
///
/// The only write path into a generation, so the success-only invariant is
/// enforced here.
#[derive(Clone)]
pub struct Cache {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("name", &self.name).finish()
    }
}

impl Cache {
    /// Open (creating if needed) a generation and return a handle to it.
    pub async fn open(
        storage: Arc<dyn CacheStorage>, name: &str, purpose: CachePurpose, created_at_install: bool,
    ) -> Result<Self, Error> {
        storage.open(name, purpose, created_at_install).await?;
        Ok(Self::handle(storage, name))
    }

    /// A handle to a generation assumed to exist.
    pub fn handle(storage: Arc<dyn CacheStorage>, name: &str) -> Self {
        Self { storage, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn match_request(&self, request: &AgentRequest) -> Result<Option<AgentResponse>, Error> {
        self.storage.lookup(&self.name, request).await
    }

    /// Store a response. Rejects anything outside the 2xx range.
    pub async fn put(&self, request: &AgentRequest, response: &AgentResponse) -> Result<(), Error> {
        if !response.is_success() {
            return Err(Error::Uncacheable(response.status));
        }
        self.storage.store(&self.name, request, response).await
    }

    /// Store every pair or none of them.
    pub async fn put_all(&self, entries: &[(AgentRequest, AgentResponse)]) -> Result<(), Error> {
        if let Some((_, response)) = entries.iter().find(|(_, response)| !response.is_success()) {
            return Err(Error::Uncacheable(response.status));
        }
        self.storage.store_all(&self.name, entries).await
    }

    pub async fn delete(&self, request: &AgentRequest) -> Result<bool, Error> {
        self.storage.evict(&self.name, request).await
    }

    pub async fn keys(&self) -> Result<Vec<CacheKey>, Error> {
        self.storage.keys(&self.name).await
    }

    pub async fn trim(&self, max_entries: usize) -> Result<u64, Error> {
        self.storage.trim(&self.name, max_entries).await
    }

    pub async fn clear(&self) -> Result<u64, Error> {
        self.storage.clear(&self.name).await
    }
}
