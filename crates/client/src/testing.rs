//! In-process doubles for the host capabilities.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use harbor_core::cache::{CacheGeneration, CacheKey, CachePurpose, CacheStorage};
use harbor_core::{AgentRequest, AgentResponse, Error};
use url::Url;

use crate::fetch::Transport;
use crate::notify::{ClientView, DisplayedNotification, NotificationCenter, NotificationIntent, ViewHost};

pub const ORIGIN: &str = "https://app.test";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn get(path: &str) -> AgentRequest {
    AgentRequest::get(url(path))
}

pub fn navigate(path: &str) -> AgentRequest {
    AgentRequest::navigate(url(path))
}

/// Scripted network peer. Unknown URLs answer 404; offline mode fails every call.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, AgentResponse>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, response: AgentResponse) {
        self.routes.lock().unwrap().insert(url(path).to_string(), response);
    }

    pub fn respond_ok(&self, path: &str, body: &str) {
        self.respond(path, AgentResponse::text(200, body));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        let target = url(path).to_string();
        self.calls.lock().unwrap().iter().filter(|u| **u == target).count()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: &AgentRequest) -> Result<AgentResponse, Error> {
        self.calls.lock().unwrap().push(request.url.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("network unreachable".into()));
        }
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| AgentResponse::text(404, "not found")))
    }
}

/// A store that is always unavailable.
pub struct BrokenStorage;

fn unavailable() -> Error {
    Error::Database(tokio_rusqlite::Error::ConnectionClosed)
}

#[async_trait::async_trait]
impl CacheStorage for BrokenStorage {
    async fn open(&self, _: &str, _: CachePurpose, _: bool) -> Result<(), Error> {
        Err(unavailable())
    }
    async fn generations(&self) -> Result<Vec<CacheGeneration>, Error> {
        Err(unavailable())
    }
    async fn delete_generation(&self, _: &str) -> Result<bool, Error> {
        Err(unavailable())
    }
    async fn lookup(&self, _: &str, _: &AgentRequest) -> Result<Option<AgentResponse>, Error> {
        Err(unavailable())
    }
    async fn store(&self, _: &str, _: &AgentRequest, _: &AgentResponse) -> Result<(), Error> {
        Err(unavailable())
    }
    async fn store_all(&self, _: &str, _: &[(AgentRequest, AgentResponse)]) -> Result<(), Error> {
        Err(unavailable())
    }
    async fn evict(&self, _: &str, _: &AgentRequest) -> Result<bool, Error> {
        Err(unavailable())
    }
    async fn keys(&self, _: &str) -> Result<Vec<CacheKey>, Error> {
        Err(unavailable())
    }
    async fn trim(&self, _: &str, _: usize) -> Result<u64, Error> {
        Err(unavailable())
    }
    async fn clear(&self, _: &str) -> Result<u64, Error> {
        Err(unavailable())
    }
}

#[derive(Default)]
pub struct RecordingCenter {
    next: AtomicUsize,
    shown: Mutex<Vec<DisplayedNotification>>,
    closed: Mutex<Vec<String>>,
}

impl RecordingCenter {
    pub fn shown(&self) -> Vec<DisplayedNotification> {
        self.shown.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NotificationCenter for RecordingCenter {
    async fn show(&self, intent: &NotificationIntent) -> Result<DisplayedNotification, Error> {
        let id = format!("n-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1);
        let shown = DisplayedNotification { id, intent: intent.clone() };
        self.shown.lock().unwrap().push(shown.clone());
        Ok(shown)
    }

    async fn close(&self, id: &str) -> Result<(), Error> {
        self.closed.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

pub struct FakeViews {
    views: Mutex<Vec<ClientView>>,
    can_open: bool,
    focus_fails: bool,
    focused: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
    claims: AtomicUsize,
}

impl Default for FakeViews {
    fn default() -> Self {
        Self {
            views: Mutex::new(Vec::new()),
            can_open: true,
            focus_fails: false,
            focused: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            claims: AtomicUsize::new(0),
        }
    }
}

impl FakeViews {
    /// Views named `view-1`, `view-2`, ... in order.
    pub fn with_views(urls: &[&str]) -> Self {
        let views = urls
            .iter()
            .enumerate()
            .map(|(i, u)| ClientView { id: format!("view-{}", i + 1), url: Url::parse(u).unwrap() })
            .collect();
        Self { views: Mutex::new(views), ..Default::default() }
    }

    pub fn without_open() -> Self {
        Self { can_open: false, ..Default::default() }
    }

    /// Existing views that refuse focus, as a view closing mid-click would.
    pub fn refusing_focus(urls: &[&str]) -> Self {
        Self { focus_fails: true, ..Self::with_views(urls) }
    }

    pub fn focused(&self) -> Vec<String> {
        self.focused.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ViewHost for FakeViews {
    async fn views(&self) -> Result<Vec<ClientView>, Error> {
        Ok(self.views.lock().unwrap().clone())
    }

    async fn focus(&self, id: &str) -> Result<(), Error> {
        if self.focus_fails {
            return Err(Error::Host(format!("view {id} went away")));
        }
        self.focused.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn open(&self, url: &Url) -> Result<Option<ClientView>, Error> {
        if !self.can_open {
            return Ok(None);
        }
        self.opened.lock().unwrap().push(url.to_string());
        let mut views = self.views.lock().unwrap();
        let view = ClientView { id: format!("view-{}", views.len() + 1), url: url.clone() };
        views.push(view.clone());
        Ok(Some(view))
    }

    async fn claim(&self) -> Result<usize, Error> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(self.views.lock().unwrap().len())
    }
}
