//! Agent lifecycle: install, activate, takeover.
//!
//! ```text
//! INSTALLING --install ok--> WAITING --activate--> ACTIVATING --> ACTIVE
//!     |                                                            |
//!     +--install failed--> REDUNDANT          ACTIVE --activate--> ACTIVE
//! ```
//!
//! The controller is the only component that names, creates or deletes
//! cache generations.

pub mod generations;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use harbor_core::{AgentRequest, Cache, CachePurpose, CacheStorage, Error};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::fetch::Transport;
use crate::notify::ViewHost;

pub use generations::Generations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
    /// Install failed; this instance never activates.
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// What an install stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    pub generation: String,
    pub precached: Vec<String>,
    /// Set when the install went straight on to activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated: Option<ActivateReport>,
}

/// What an activation reaped and claimed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    /// Obsolete generations whose deletion failed; retried on the next activation.
    pub failed: Vec<String>,
    pub claimed: usize,
}

/// Puts the state back if an activation is dropped before it finishes.
struct Rollback<'a> {
    state: &'a RwLock<LifecycleState>,
    prior: LifecycleState,
    armed: bool,
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.state.try_write() {
            Ok(mut state) => {
                *state = self.prior;
                tracing::warn!(state = %self.prior, "activation interrupted; state restored");
            }
            Err(_) => tracing::error!(state = %self.prior, "activation interrupted; state lock busy, not restored"),
        }
    }
}

pub struct Lifecycle {
    state: RwLock<LifecycleState>,
    skip_waiting: AtomicBool,
    generations: Generations,
    manifest: Vec<Url>,
}

impl Lifecycle {
    pub fn new(generations: Generations, manifest: Vec<Url>) -> Self {
        Self {
            state: RwLock::new(LifecycleState::Installing),
            skip_waiting: AtomicBool::new(false),
            generations,
            manifest,
        }
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Eligible to intercept requests.
    pub async fn is_active(&self) -> bool {
        self.state().await == LifecycleState::Active
    }

    /// Set once install succeeds: activate without waiting for old instances.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> &Generations {
        &self.generations
    }

    /// Handle to the current generation for `purpose`.
    pub fn cache(&self, storage: &Arc<dyn CacheStorage>, purpose: CachePurpose) -> Cache {
        Cache::handle(storage.clone(), self.generations.name(purpose))
    }

    /// Precache the manifest into the static generation.
    ///
    /// All-or-nothing: every manifest URL must fetch with a 2xx status
    /// before anything is stored. Any failure leaves the agent redundant.
    pub async fn install(
        &self, storage: &Arc<dyn CacheStorage>, transport: &dyn Transport,
    ) -> Result<InstallReport, Error> {
        {
            let state = self.state.read().await;
            if *state != LifecycleState::Installing {
                return Err(Error::Lifecycle(format!("cannot install while {state}")));
            }
        }

        tracing::info!(generation = self.generations.name(CachePurpose::Static), "installing");

        match self.precache(storage, transport).await {
            Ok(report) => {
                *self.state.write().await = LifecycleState::Waiting;
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::info!(precached = report.precached.len(), "installed; skipping wait");
                Ok(report)
            }
            Err(e) => {
                *self.state.write().await = LifecycleState::Redundant;
                tracing::error!("install failed: {e}");
                Err(Error::InstallFailed(e.to_string()))
            }
        }
    }

    async fn precache(
        &self, storage: &Arc<dyn CacheStorage>, transport: &dyn Transport,
    ) -> Result<InstallReport, Error> {
        let name = self.generations.name(CachePurpose::Static);
        let cache = Cache::open(storage.clone(), name, CachePurpose::Static, true).await?;

        let mut entries = Vec::with_capacity(self.manifest.len());
        for url in &self.manifest {
            let request = AgentRequest::get(url.clone());
            let response = transport.fetch(&request).await?;
            if !response.is_success() {
                return Err(Error::Network(format!("{url} answered {}", response.status)));
            }
            entries.push((request, response));
        }

        cache.put_all(&entries).await?;

        Ok(InstallReport {
            generation: name.to_string(),
            precached: self.manifest.iter().map(Url::to_string).collect(),
            activated: None,
        })
    }

    /// Reap obsolete generations, make sure both current ones exist, and
    /// claim every open view.
    ///
    /// Per-generation cleanup failures and claim failures are logged and do
    /// not abort activation. Running it again on an active agent is a no-op
    /// apart from a fresh claim.
    ///
    /// Dropping the future part way through puts the state back to where it
    /// was, so a later activation can run.
    pub async fn activate(
        &self, storage: &Arc<dyn CacheStorage>, views: &dyn ViewHost,
    ) -> Result<ActivateReport, Error> {
        let prior = {
            let mut state = self.state.write().await;
            match *state {
                prior @ (LifecycleState::Waiting | LifecycleState::Active) => {
                    *state = LifecycleState::Activating;
                    prior
                }
                other => return Err(Error::Lifecycle(format!("cannot activate while {other}"))),
            }
        };
        let mut rollback = Rollback { state: &self.state, prior, armed: true };

        let mut report = ActivateReport::default();

        match storage.generations().await {
            Ok(existing) => {
                for generation in existing.iter().filter(|g| self.generations.is_obsolete(&g.name)) {
                    match storage.delete_generation(&generation.name).await {
                        Ok(_) => {
                            tracing::info!(generation = %generation.name, "deleted obsolete generation");
                            report.deleted.push(generation.name.clone());
                        }
                        Err(e) => {
                            tracing::warn!(generation = %generation.name, "failed to delete generation: {e}");
                            report.failed.push(generation.name.clone());
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("failed to enumerate generations: {e}"),
        }

        for purpose in [CachePurpose::Static, CachePurpose::Dynamic] {
            let name = self.generations.name(purpose);
            if let Err(e) = storage.open(name, purpose, false).await {
                tracing::warn!(generation = name, "failed to open generation: {e}");
            }
        }

        match views.claim().await {
            Ok(claimed) => report.claimed = claimed,
            Err(e) => tracing::warn!("failed to claim client views: {e}"),
        }

        *self.state.write().await = LifecycleState::Active;
        rollback.armed = false;
        tracing::info!(deleted = report.deleted.len(), claimed = report.claimed, "activated");

        Ok(report)
    }
}
