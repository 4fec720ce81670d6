//! Headless host capabilities.
//!
//! Without a display the server keeps notifications and client views in
//! memory. Shown notifications stay retrievable by id until clicked.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use harbor_client::{ClientView, DisplayedNotification, NotificationCenter, NotificationIntent, ViewHost};
use harbor_core::Error;
use url::Url;

fn poisoned<T>(err: std::sync::PoisonError<T>) -> Error {
    Error::Host(format!("lock poisoned: {err}"))
}

#[derive(Debug, Default)]
pub struct HeadlessNotifications {
    next: AtomicU64,
    open: Mutex<BTreeMap<String, DisplayedNotification>>,
}

impl HeadlessNotifications {
    /// A notification still on display.
    pub fn get(&self, id: &str) -> Result<Option<DisplayedNotification>, Error> {
        Ok(self.open.lock().map_err(poisoned)?.get(id).cloned())
    }

    #[cfg(test)]
    pub fn displayed(&self) -> Result<Vec<DisplayedNotification>, Error> {
        Ok(self.open.lock().map_err(poisoned)?.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl NotificationCenter for HeadlessNotifications {
    async fn show(&self, intent: &NotificationIntent) -> Result<DisplayedNotification, Error> {
        let mut open = self.open.lock().map_err(poisoned)?;
        if let Some(tag) = &intent.tag {
            open.retain(|_, shown| shown.intent.tag.as_ref() != Some(tag));
        }

        let id = format!("n-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1);
        let shown = DisplayedNotification { id: id.clone(), intent: intent.clone() };
        open.insert(id, shown.clone());
        Ok(shown)
    }

    async fn close(&self, id: &str) -> Result<(), Error> {
        self.open.lock().map_err(poisoned)?.remove(id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ViewRegistry {
    next: AtomicU64,
    views: Mutex<Vec<ClientView>>,
    focused: Mutex<Option<String>>,
}

impl ViewRegistry {
    pub fn focused(&self) -> Result<Option<String>, Error> {
        Ok(self.focused.lock().map_err(poisoned)?.clone())
    }
}

#[async_trait::async_trait]
impl ViewHost for ViewRegistry {
    async fn views(&self) -> Result<Vec<ClientView>, Error> {
        Ok(self.views.lock().map_err(poisoned)?.clone())
    }

    async fn focus(&self, id: &str) -> Result<(), Error> {
        let known = self.views.lock().map_err(poisoned)?.iter().any(|view| view.id == id);
        if !known {
            return Err(Error::Host(format!("no view {id}")));
        }
        *self.focused.lock().map_err(poisoned)? = Some(id.to_string());
        Ok(())
    }

    async fn open(&self, url: &Url) -> Result<Option<ClientView>, Error> {
        let view = ClientView { id: format!("view-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1), url: url.clone() };
        self.views.lock().map_err(poisoned)?.push(view.clone());
        *self.focused.lock().map_err(poisoned)? = Some(view.id.clone());
        tracing::debug!(view = %view.id, %url, "opened headless view");
        Ok(Some(view))
    }

    async fn claim(&self) -> Result<usize, Error> {
        Ok(self.views.lock().map_err(poisoned)?.len())
    }
}
