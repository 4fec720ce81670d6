//! Client-side agent for harbor.
//!
//! This crate provides the request interception engine: route
//! classification, strategy execution over cache generations, lifecycle
//! management, deferred sync and notification delivery.

pub mod agent;
pub mod background;
pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod route;
pub mod strategy;
pub mod sync;

#[cfg(test)]
mod testing;

pub use agent::{Agent, AgentStatus, FetchOutcome, Host};
pub use background::Background;
pub use fetch::{FetchClient, FetchConfig, Transport};
pub use lifecycle::{ActivateReport, Generations, InstallReport, Lifecycle, LifecycleState};
pub use notify::{
    ClickOutcome, ClientView, DisplayedNotification, NotificationCenter, NotificationDefaults, NotificationDispatcher,
    NotificationIntent, ViewHost,
};
pub use route::{Router, Strategy};
pub use strategy::{Executor, Served, Source};
pub use sync::{DeferredTask, RefreshRoutine, SyncContext, SyncOutcome, SyncQueue, SyncRoutine};
