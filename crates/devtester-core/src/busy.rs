// ── Busy-state registry ──
//
// Named loading flags with derived aggregates. Entries are created on
// first use and never removed. Every begin/end emits a per-key change
// and recomputes the aggregates, which publish through `watch` channels
// only when their value actually flips.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Single-device authentication.
pub const AUTHENTICATE: &str = "Authenticate";
/// Bulk authentication performed on initial load.
pub const AUTHENTICATE_ALL: &str = "AuthenticateAllDevices";
/// One-shot static payload fetch.
pub const STATIC_DATA: &str = "StaticData";
/// One-shot dynamic payload fetch.
pub const DYNAMIC_DATA: &str = "DynamicData";

/// Keys whose union drives the "fetching data" aggregate.
pub const DATA_FETCH_KEYS: [&str; 2] = [STATIC_DATA, DYNAMIC_DATA];

const CHANGE_CHANNEL_SIZE: usize = 64;

/// Loading flag and optional message for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingState {
    pub is_loading: bool,
    pub message: Option<String>,
}

/// Emitted whenever a key's entry is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyChange {
    pub key: String,
    pub is_loading: bool,
}

pub struct BusyRegistry {
    entries: DashMap<String, LoadingState>,
    changes: broadcast::Sender<BusyChange>,
    any_loading: watch::Sender<bool>,
    fetching_data: watch::Sender<bool>,
}

impl Default for BusyRegistry {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_SIZE);
        let (any_loading, _) = watch::channel(false);
        let (fetching_data, _) = watch::channel(false);
        Self {
            entries: DashMap::new(),
            changes,
            any_loading,
            fetching_data,
        }
    }
}

impl BusyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` loading and return a guard that ends it on drop.
    ///
    /// The guard releases on every exit path, including early returns
    /// and `?` propagation in the caller.
    pub fn begin(self: &Arc<Self>, key: &str) -> BusyGuard {
        self.begin_with_message(key, None)
    }

    pub fn begin_with_message(self: &Arc<Self>, key: &str, message: Option<String>) -> BusyGuard {
        self.set(key, true, message);
        BusyGuard {
            registry: Arc::clone(self),
            key: key.to_owned(),
        }
    }

    /// Mark `key` loading without a guard. Pair with [`end`](Self::end).
    pub fn start(&self, key: &str) {
        self.set(key, true, None);
    }

    pub fn end(&self, key: &str) {
        self.set(key, false, None);
    }

    fn set(&self, key: &str, is_loading: bool, message: Option<String>) {
        // Scope the entry guard so the aggregate scan below can't deadlock.
        {
            let mut entry = self.entries.entry(key.to_owned()).or_default();
            entry.is_loading = is_loading;
            entry.message = message;
        }
        debug!(key, is_loading, "busy state changed");
        let _ = self.changes.send(BusyChange {
            key: key.to_owned(),
            is_loading,
        });
        self.recompute();
    }

    fn recompute(&self) {
        let any = self.entries.iter().any(|e| e.is_loading);
        let fetching = DATA_FETCH_KEYS.iter().any(|k| self.is_loading(k));
        self.any_loading.send_if_modified(|v| replace_if_changed(v, any));
        self.fetching_data
            .send_if_modified(|v| replace_if_changed(v, fetching));
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn is_loading(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| e.is_loading)
    }

    pub fn state(&self, key: &str) -> Option<LoadingState> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Any entry currently loading.
    pub fn any_loading(&self) -> bool {
        *self.any_loading.borrow()
    }

    /// Any data-fetch entry currently loading.
    pub fn is_fetching_data(&self) -> bool {
        *self.fetching_data.borrow()
    }

    // ── Subscriptions ───────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<BusyChange> {
        self.changes.subscribe()
    }

    pub fn watch_any_loading(&self) -> watch::Receiver<bool> {
        self.any_loading.subscribe()
    }

    pub fn watch_fetching_data(&self) -> watch::Receiver<bool> {
        self.fetching_data.subscribe()
    }
}

fn replace_if_changed(slot: &mut bool, value: bool) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Scoped acquisition of a busy key; ends the key when dropped.
#[must_use = "dropping the guard immediately ends the busy state"]
pub struct BusyGuard {
    registry: Arc<BusyRegistry>,
    key: String,
}

impl BusyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.registry.end(&self.key);
    }
}
