//! The interception agent.
//!
//! [`Agent`] owns every component and exposes one method per host event:
//! install, activate, fetch, sync, push and notification click. Nothing else
//! is a public entry point for the hosting environment.

use std::sync::Arc;

use harbor_core::{AgentRequest, AppConfig, Cache, CacheGeneration, CachePurpose, CacheStorage, Error};
use serde::Serialize;
use url::Url;

use crate::background::Background;
use crate::fetch::{Transport, resolve};
use crate::lifecycle::{ActivateReport, Generations, InstallReport, Lifecycle, LifecycleState};
use crate::notify::{
    ClickOutcome, DisplayedNotification, NotificationCenter, NotificationDefaults, NotificationDispatcher, ViewHost,
};
use crate::route::Router;
use crate::strategy::offline::{self, FallbackKind};
use crate::strategy::{Executor, Served, Source};
use crate::sync::{DeferredTask, SyncContext, SyncOutcome, SyncQueue};

/// Capabilities the hosting environment provides.
#[derive(Clone)]
pub struct Host {
    pub storage: Arc<dyn CacheStorage>,
    pub transport: Arc<dyn Transport>,
    pub notifications: Arc<dyn NotificationCenter>,
    pub views: Arc<dyn ViewHost>,
}

/// Result of a fetch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host sends the request itself.
    Passthrough,
    Responded(Served),
}

/// Snapshot of the agent for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub state: LifecycleState,
    pub static_generation: String,
    pub dynamic_generation: String,
    pub generations: Vec<CacheGeneration>,
    pub skip_waiting: bool,
    pub pending_sync: Vec<DeferredTask>,
    pub background_tasks: usize,
}

pub struct Agent {
    origin: Url,
    router: Router,
    lifecycle: Lifecycle,
    executor: Executor,
    sync: Arc<SyncQueue>,
    notifications: NotificationDispatcher,
    storage: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    views: Arc<dyn ViewHost>,
    background: Arc<Background>,
    dynamic_max_entries: usize,
}

impl Agent {
    /// Build an agent from configuration and host capabilities.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin or a manifest entry does not resolve.
    pub fn new(config: &AppConfig, host: Host) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = config
            .precache
            .iter()
            .map(|entry| resolve(&origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let generations = Generations::new(&config.cache_prefix, &config.cache_version);
        let background = Arc::new(Background::new());
        let executor = Executor::new(
            host.transport.clone(),
            host.storage.clone(),
            generations.clone(),
            background.clone(),
            config.dynamic_max_entries,
            &origin,
        );
        let notifications = NotificationDispatcher::new(
            host.notifications,
            host.views.clone(),
            NotificationDefaults::from(config),
            origin.clone(),
        );

        Ok(Self {
            router: Router::new(&config.api_prefix),
            lifecycle: Lifecycle::new(generations, manifest),
            executor,
            sync: Arc::new(SyncQueue::standard()),
            notifications,
            storage: host.storage,
            transport: host.transport,
            views: host.views,
            background,
            origin,
            dynamic_max_entries: config.dynamic_max_entries,
        })
    }

    /// Replace the deferred-work dispatch table.
    pub fn with_sync_queue(mut self, queue: SyncQueue) -> Self {
        self.sync = Arc::new(queue);
        self
    }

    pub fn generations(&self) -> &Generations {
        self.lifecycle.generations()
    }

    pub async fn state(&self) -> LifecycleState {
        self.lifecycle.state().await
    }

    /// Resolve a possibly relative target against the origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    /// Handle to the current generation for `purpose`.
    pub fn cache(&self, purpose: CachePurpose) -> Cache {
        self.lifecycle.cache(&self.storage, purpose)
    }

    /// Precache the manifest, then activate straight away when the install
    /// asked to skip waiting.
    ///
    /// An activation failure is logged; the install itself still succeeded.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let mut report = self.lifecycle.install(&self.storage, self.transport.as_ref()).await?;
        if self.lifecycle.skip_waiting() {
            match self.activate().await {
                Ok(activated) => report.activated = Some(activated),
                Err(e) => tracing::warn!("activation after install failed: {e}"),
            }
        }
        Ok(report)
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.activate(&self.storage, self.views.as_ref()).await
    }

    /// Handle an outbound request.
    ///
    /// Never fails: strategy errors end in the offline responder.
    pub async fn fetch(&self, request: &AgentRequest) -> FetchOutcome {
        if !self.lifecycle.is_active().await {
            tracing::trace!(url = %request.url, "not active; passing through");
            return FetchOutcome::Passthrough;
        }

        let Some(strategy) = self.router.classify(request) else {
            tracing::trace!(method = %request.method, url = %request.url, "passing through");
            return FetchOutcome::Passthrough;
        };

        match self.executor.execute(strategy, request).await {
            Ok(served) => FetchOutcome::Responded(served),
            Err(e) => {
                tracing::info!(%strategy, url = %request.url, "request failed, responding offline: {e}");
                FetchOutcome::Responded(self.offline(request).await)
            }
        }
    }

    async fn offline(&self, request: &AgentRequest) -> Served {
        let kind = if request.navigation {
            FallbackKind::Navigation
        } else if self.router.is_api(&request.url) {
            FallbackKind::Api
        } else {
            FallbackKind::Other
        };

        let root = match kind {
            FallbackKind::Navigation => self.executor.match_any(&self.executor.root_request()).await,
            _ => None,
        };
        let source = if root.is_some() { Source::Cache } else { Source::Offline };

        Served { response: offline::respond(kind, root), source }
    }

    /// Record a deferred task for later resync.
    pub fn sync_register(&self, tag: &str) -> DeferredTask {
        self.sync.register(tag)
    }

    pub fn pending_sync(&self) -> Vec<DeferredTask> {
        self.sync.pending()
    }

    fn sync_context(&self) -> SyncContext {
        SyncContext {
            transport: self.transport.clone(),
            dynamic: self.cache(CachePurpose::Dynamic),
            dynamic_max_entries: self.dynamic_max_entries,
            router: self.router.clone(),
            origin: self.origin.clone(),
        }
    }

    /// Resync signal: run the routine for `tag` in the background.
    pub fn sync(&self, tag: &str) {
        let queue = self.sync.clone();
        let ctx = self.sync_context();
        let tag = tag.to_string();
        self.background.spawn("sync", async move {
            queue.dispatch(&tag, &ctx).await;
            Ok(())
        });
    }

    /// Run the routine for `tag` and wait for it.
    pub async fn sync_now(&self, tag: &str) -> SyncOutcome {
        self.sync.dispatch(tag, &self.sync_context()).await
    }

    pub async fn push(&self, payload: Option<&[u8]>) -> Result<DisplayedNotification, Error> {
        self.notifications.push(payload).await
    }

    pub async fn notification_click(&self, notification: &DisplayedNotification) -> Result<ClickOutcome, Error> {
        self.notifications.click(notification).await
    }

    pub async fn status(&self) -> AgentStatus {
        let generations = self.storage.generations().await.unwrap_or_else(|e| {
            tracing::warn!("failed to enumerate generations: {e}");
            Vec::new()
        });
        let names = self.lifecycle.generations();

        AgentStatus {
            state: self.lifecycle.state().await,
            static_generation: names.name(CachePurpose::Static).to_string(),
            dynamic_generation: names.name(CachePurpose::Dynamic).to_string(),
            generations,
            skip_waiting: self.lifecycle.skip_waiting(),
            pending_sync: self.sync.pending(),
            background_tasks: self.background.pending(),
        }
    }

    /// Wait for background revalidations and sync routines.
    pub async fn settle(&self) {
        self.background.settle().await;
    }

    pub fn shutdown(&self) {
        self.background.shutdown();
    }
}
