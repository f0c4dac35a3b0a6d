// ── Notification router ──
//
// Synchronous, at-most-once fan-out of leveled toast messages. Nothing
// is buffered: a notification published with no matching listener is
// gone. Listeners filter on the notification's target view.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use strum::Display;
use tracing::trace;

/// The device list surface.
pub const VIEW_DEVICE_LIST: &str = "DeviceList";
/// The add/edit form surface.
pub const VIEW_DEVICE_FORM: &str = "DeviceForm";
/// The static/dynamic payload surface.
pub const VIEW_DEVICE_DETAILS: &str = "DeviceDetails";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast. `target_view` of `None` reaches every listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub target_view: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            target_view: None,
            issued_at: Utc::now(),
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, msg)
    }

    pub fn success(msg: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, msg)
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, msg)
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, msg)
    }

    /// Restrict delivery to listeners registered for `view`.
    pub fn for_view(mut self, view: impl Into<String>) -> Self {
        self.target_view = Some(view.into());
        self
    }
}

/// Which notifications a listener accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewFilter {
    /// Everything, targeted or not (log sinks, the CLI).
    Any,
    /// Untargeted notifications plus those targeted at this view.
    View(String),
}

impl ViewFilter {
    pub fn view(name: impl Into<String>) -> Self {
        Self::View(name.into())
    }

    pub fn accepts(&self, notification: &Notification) -> bool {
        match (self, notification.target_view.as_deref()) {
            (Self::Any, _) | (Self::View(_), None) => true,
            (Self::View(own), Some(target)) => own == target,
        }
    }
}

/// Handle returned by [`NotificationRouter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;

struct Listener {
    filter: ViewFilter,
    handler: Handler,
}

#[derive(Default)]
pub struct NotificationRouter {
    listeners: DashMap<ListenerId, Listener>,
    next_id: AtomicU64,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, filter: ViewFilter, handler: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(
            id,
            Listener {
                filter,
                handler: Arc::new(handler),
            },
        );
        id
    }

    /// Returns `false` if the listener was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver to every listener whose filter accepts, then forget it.
    pub fn publish(&self, notification: &Notification) {
        // Snapshot handlers first so a handler may (un)subscribe re-entrantly.
        let handlers: Vec<Handler> = self
            .listeners
            .iter()
            .filter(|l| l.filter.accepts(notification))
            .map(|l| Arc::clone(&l.handler))
            .collect();

        trace!(
            level = %notification.level,
            target = ?notification.target_view,
            delivered = handlers.len(),
            "notification published"
        );
        for handler in handlers {
            handler(notification);
        }
    }
}
