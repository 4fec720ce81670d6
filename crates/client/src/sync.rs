//! Deferred work queue.
//!
//! The client application registers a tag when an online-dependent action
//! cannot complete. A later sync event carrying that tag runs the routine
//! bound to it exactly once; the task is consumed whether or not the routine
//! succeeds. Unknown tags are logged and dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use harbor_core::{AgentRequest, AgentResponse, Cache, CachePurpose, Error};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::{Transport, resolve};
use crate::route::Router;
use crate::strategy::store;

pub const PROFILE_UPDATE: &str = "profile-update";
pub const MESSAGE_SEND: &str = "message-send";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredTask {
    pub tag: String,
    pub enqueued_at: DateTime<Utc>,
}

/// What a routine may touch.
#[derive(Clone)]
pub struct SyncContext {
    pub transport: Arc<dyn Transport>,
    /// The current dynamic generation.
    pub dynamic: Cache,
    pub dynamic_max_entries: usize,
    pub router: Router,
    pub origin: Url,
}

impl SyncContext {
    /// Refetch `path`, storing the response only where its route would.
    ///
    /// Routes that cache into the dynamic generation get the fresh copy, with
    /// the same trim as any other dynamic write. Network-only routes are
    /// replayed without touching the cache.
    pub async fn refresh(&self, path: &str) -> Result<AgentResponse, Error> {
        let url = resolve(&self.origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
        let request = AgentRequest::get(url);
        let response = self.transport.fetch(&request).await?;
        if !response.is_success() {
            return Err(Error::SyncFailed(format!("{path} answered {}", response.status)));
        }

        let stores_into = self.router.classify(&request).and_then(|strategy| strategy.stores_into());
        if stores_into == Some(CachePurpose::Dynamic) {
            store(&self.dynamic, Some(self.dynamic_max_entries), &request, &response).await;
        } else {
            tracing::debug!(%path, "refreshed without caching");
        }
        Ok(response)
    }
}

/// An idempotent resynchronization routine.
#[async_trait::async_trait]
pub trait SyncRoutine: Send + Sync {
    async fn run(&self, ctx: &SyncContext) -> Result<(), Error>;
}

/// Refetch a fixed set of API paths through [`SyncContext::refresh`].
pub struct RefreshRoutine {
    paths: Vec<String>,
}

impl RefreshRoutine {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }
}

#[async_trait::async_trait]
impl SyncRoutine for RefreshRoutine {
    async fn run(&self, ctx: &SyncContext) -> Result<(), Error> {
        for path in &self.paths {
            ctx.refresh(path).await?;
        }
        Ok(())
    }
}

/// How a dispatched task ended. The task is consumed in every case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed,
    Failed(String),
    UnknownTag,
}

/// Tag-keyed dispatch table plus the set of registered tasks.
pub struct SyncQueue {
    routines: HashMap<String, Arc<dyn SyncRoutine>>,
    pending: Mutex<Vec<DeferredTask>>,
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::standard()
    }
}

impl SyncQueue {
    pub fn empty() -> Self {
        Self { routines: HashMap::new(), pending: Mutex::new(Vec::new()) }
    }

    /// `profile-update` refreshes the cached profile; `message-send` replays
    /// the network-only message list.
    pub fn standard() -> Self {
        Self::empty()
            .with_routine(PROFILE_UPDATE, Arc::new(RefreshRoutine::new(["/api/profile"])))
            .with_routine(MESSAGE_SEND, Arc::new(RefreshRoutine::new(["/api/messages"])))
    }

    pub fn with_routine(mut self, tag: &str, routine: Arc<dyn SyncRoutine>) -> Self {
        self.routines.insert(tag.to_string(), routine);
        self
    }

    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.routines.keys().cloned().collect();
        tags.sort();
        tags
    }

    fn pending_guard(&self) -> MutexGuard<'_, Vec<DeferredTask>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a task. A tag already waiting is not queued twice.
    pub fn register(&self, tag: &str) -> DeferredTask {
        let mut pending = self.pending_guard();
        if let Some(existing) = pending.iter().find(|task| task.tag == tag) {
            return existing.clone();
        }
        let task = DeferredTask { tag: tag.to_string(), enqueued_at: Utc::now() };
        pending.push(task.clone());
        tracing::debug!(tag, "deferred task registered");
        task
    }

    pub fn pending(&self) -> Vec<DeferredTask> {
        self.pending_guard().clone()
    }

    /// Consume the task for `tag` and run its routine once.
    ///
    /// Routine failures are logged and reported, never propagated.
    pub async fn dispatch(&self, tag: &str, ctx: &SyncContext) -> SyncOutcome {
        self.pending_guard().retain(|task| task.tag != tag);

        let Some(routine) = self.routines.get(tag).cloned() else {
            tracing::info!(tag, "no routine for sync tag; dropped");
            return SyncOutcome::UnknownTag;
        };

        match routine.run(ctx).await {
            Ok(()) => {
                tracing::info!(tag, "sync routine completed");
                SyncOutcome::Completed
            }
            Err(e) => {
                tracing::warn!(tag, "sync routine failed: {e}");
                SyncOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, ORIGIN, get};
    use harbor_core::{CacheDb, CachePurpose, CacheStorage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        runs: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SyncRoutine for Counting {
        async fn run(&self, _: &SyncContext) -> Result<(), Error> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl SyncRoutine for Failing {
        async fn run(&self, _: &SyncContext) -> Result<(), Error> {
            Err(Error::Network("still offline".into()))
        }
    }

    async fn context_with_limit(transport: Arc<MockTransport>, dynamic_max_entries: usize) -> SyncContext {
        let storage: Arc<dyn CacheStorage> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let dynamic = Cache::open(storage, "harbor-dynamic-v1", CachePurpose::Dynamic, false).await.unwrap();
        SyncContext {
            transport,
            dynamic,
            dynamic_max_entries,
            router: Router::new("/api/"),
            origin: Url::parse(ORIGIN).unwrap(),
        }
    }

    async fn context(transport: Arc<MockTransport>) -> SyncContext {
        context_with_limit(transport, 50).await
    }

    #[test]
    fn test_standard_tags() {
        let queue = SyncQueue::standard();
        assert_eq!(queue.tags(), vec!["message-send".to_string(), "profile-update".to_string()]);
    }

    #[test]
    fn test_register_deduplicates() {
        let queue = SyncQueue::standard();
        let first = queue.register(MESSAGE_SEND);
        let second = queue.register(MESSAGE_SEND);
        assert_eq!(first, second);
        assert_eq!(queue.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_runs_once_and_consumes() {
        let counting = Arc::new(Counting::default());
        let queue = SyncQueue::empty().with_routine(MESSAGE_SEND, counting.clone());
        let ctx = context(Arc::new(MockTransport::new())).await;

        queue.register(MESSAGE_SEND);
        assert_eq!(queue.dispatch(MESSAGE_SEND, &ctx).await, SyncOutcome::Completed);

        assert_eq!(counting.runs.load(Ordering::SeqCst), 1);
        assert!(queue.pending().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tag_is_noop() {
        let counting = Arc::new(Counting::default());
        let queue = SyncQueue::empty().with_routine(MESSAGE_SEND, counting.clone());
        let ctx = context(Arc::new(MockTransport::new())).await;

        assert_eq!(queue.dispatch("unknown-tag", &ctx).await, SyncOutcome::UnknownTag);
        assert_eq!(counting.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_still_consumes() {
        let queue = SyncQueue::empty().with_routine(PROFILE_UPDATE, Arc::new(Failing));
        let ctx = context(Arc::new(MockTransport::new())).await;

        queue.register(PROFILE_UPDATE);
        let outcome = queue.dispatch(PROFILE_UPDATE, &ctx).await;

        assert!(matches!(outcome, SyncOutcome::Failed(_)));
        assert!(queue.pending().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_routine_updates_dynamic_entry() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_ok("/api/profile", r#"{"name":"ada"}"#);
        let ctx = context(transport.clone()).await;

        RefreshRoutine::new(["/api/profile"]).run(&ctx).await.unwrap();

        assert_eq!(transport.calls_to("/api/profile"), 1);
        let cached = ctx.dynamic.match_request(&get("/api/profile")).await.unwrap().unwrap();
        assert_eq!(cached.body_text(), r#"{"name":"ada"}"#);
    }

    #[tokio::test]
    async fn test_refresh_skips_network_only_route() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_ok("/api/messages", r#"{"messages":[]}"#);
        let ctx = context(transport.clone()).await;

        let response = ctx.refresh("/api/messages").await.unwrap();

        assert_eq!(response.body_text(), r#"{"messages":[]}"#);
        assert_eq!(transport.calls_to("/api/messages"), 1);
        assert!(ctx.dynamic.match_request(&get("/api/messages")).await.unwrap().is_none());
        assert!(ctx.dynamic.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_trims_dynamic_generation() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_ok("/api/profile", r#"{"name":"ada"}"#);
        let ctx = context_with_limit(transport, 1).await;
        ctx.dynamic.put(&get("/old.json"), &AgentResponse::text(200, "old")).await.unwrap();

        ctx.refresh("/api/profile").await.unwrap();

        let keys = ctx.dynamic.keys().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert!(ctx.dynamic.match_request(&get("/api/profile")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_routine_reports_error_status() {
        let ctx = context(Arc::new(MockTransport::new())).await;
        let result = RefreshRoutine::new(["/api/profile"]).run(&ctx).await;
        assert!(matches!(result, Err(Error::SyncFailed(_))));
    }
}
