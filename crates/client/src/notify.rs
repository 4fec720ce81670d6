//! Push notifications and click routing.
//!
//! A push payload becomes a [`NotificationIntent`]; missing fields fall back
//! to configured defaults and an unparseable payload yields the defaults
//! outright. Clicking a notification focuses an open view already showing
//! the target, or opens a new one.

use std::sync::Arc;

use harbor_core::{AppConfig, Error};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::resolve;

/// What a notification shows and where a click leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub title: String,
    pub body: String,
    /// Opaque data attached to the notification: the view a click opens.
    pub target_url: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    /// Notifications sharing a tag replace each other on the host.
    pub tag: Option<String>,
}

/// Structured push message; every field optional.
#[derive(Debug, Default, Deserialize)]
struct PushMessage {
    title: Option<String>,
    body: Option<String>,
    #[serde(alias = "targetUrl", alias = "target_url")]
    url: Option<String>,
    icon: Option<String>,
    badge: Option<String>,
    tag: Option<String>,
}

/// Static notification content used when a payload carries none.
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub url: String,
    pub icon: String,
}

impl From<&AppConfig> for NotificationDefaults {
    fn from(config: &AppConfig) -> Self {
        Self {
            title: config.notification_title.clone(),
            body: config.notification_body.clone(),
            url: config.notification_url.clone(),
            icon: config.notification_icon.clone(),
        }
    }
}

impl NotificationDefaults {
    /// Build the intent for a push payload.
    ///
    /// Never fails: a missing payload or one that is not a JSON message
    /// yields the defaults.
    pub fn intent(&self, payload: Option<&[u8]>) -> NotificationIntent {
        let message = match payload {
            None => PushMessage::default(),
            Some(bytes) => match serde_json::from_slice::<PushMessage>(bytes) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(len = bytes.len(), "unparseable push payload; using defaults: {e}");
                    PushMessage::default()
                }
            },
        };

        NotificationIntent {
            title: message.title.unwrap_or_else(|| self.title.clone()),
            body: message.body.unwrap_or_else(|| self.body.clone()),
            target_url: message.url.unwrap_or_else(|| self.url.clone()),
            icon: Some(message.icon.unwrap_or_else(|| self.icon.clone())),
            badge: message.badge,
            tag: message.tag,
        }
    }
}

/// A notification the host is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedNotification {
    pub id: String,
    pub intent: NotificationIntent,
}

/// Host notification display subsystem.
#[async_trait::async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn show(&self, intent: &NotificationIntent) -> Result<DisplayedNotification, Error>;

    async fn close(&self, id: &str) -> Result<(), Error>;
}

/// An open client view (window or tab) of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientView {
    pub id: String,
    pub url: Url,
}

/// Host view enumeration, focus and open capability.
#[async_trait::async_trait]
pub trait ViewHost: Send + Sync {
    async fn views(&self) -> Result<Vec<ClientView>, Error>;

    async fn focus(&self, id: &str) -> Result<(), Error>;

    /// Open a new view. `Ok(None)` when the host has no way to open one.
    async fn open(&self, url: &Url) -> Result<Option<ClientView>, Error>;

    /// Take control of every open view without a reload. Returns how many.
    async fn claim(&self) -> Result<usize, Error>;
}

/// Result of routing a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "view", rename_all = "snake_case")]
pub enum ClickOutcome {
    Focused(String),
    Opened(String),
    /// The host cannot open views; nothing happened.
    Unsupported,
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

pub struct NotificationDispatcher {
    center: Arc<dyn NotificationCenter>,
    views: Arc<dyn ViewHost>,
    defaults: NotificationDefaults,
    origin: Url,
}

impl NotificationDispatcher {
    pub fn new(
        center: Arc<dyn NotificationCenter>, views: Arc<dyn ViewHost>, defaults: NotificationDefaults, origin: Url,
    ) -> Self {
        Self { center, views, defaults, origin }
    }

    /// Display a notification for an inbound push payload.
    pub async fn push(&self, payload: Option<&[u8]>) -> Result<DisplayedNotification, Error> {
        let intent = self.defaults.intent(payload);
        let shown = self.center.show(&intent).await?;
        tracing::info!(id = %shown.id, title = %intent.title, target = %intent.target_url, "notification shown");
        Ok(shown)
    }

    /// Close the notification, then focus or open its target view.
    pub async fn click(&self, notification: &DisplayedNotification) -> Result<ClickOutcome, Error> {
        if let Err(e) = self.center.close(&notification.id).await {
            tracing::warn!(id = %notification.id, "failed to close notification: {e}");
        }

        let target = resolve(&self.origin, &notification.intent.target_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", notification.intent.target_url)))?;

        let views = self.views.views().await.unwrap_or_else(|e| {
            tracing::warn!("failed to enumerate client views: {e}");
            Vec::new()
        });

        if let Some(view) = views.iter().find(|view| without_fragment(&view.url) == target) {
            match self.views.focus(&view.id).await {
                Ok(()) => {
                    tracing::debug!(view = %view.id, %target, "focused existing view");
                    return Ok(ClickOutcome::Focused(view.id.clone()));
                }
                Err(e) => tracing::warn!(view = %view.id, %target, "failed to focus view, opening instead: {e}"),
            }
        }

        match self.views.open(&target).await? {
            Some(view) => {
                tracing::debug!(view = %view.id, %target, "opened view");
                Ok(ClickOutcome::Opened(view.id))
            }
            None => {
                tracing::info!(%target, "host cannot open views; click ignored");
                Ok(ClickOutcome::Unsupported)
            }
        }
    }
}
