// ── Polling session manager ──
//
// At most one live subscription, bound to one device. The provider's
// callback runs on the provider's own task and only pushes onto an
// unbounded channel; the owner drains that channel on its own turn, so
// no orchestrator state is touched off-thread.
//
// Each start allocates a generation. Deliveries carry the generation of
// the session that produced them and anything from an older session is
// dropped when drained, so a stop is final even for payloads already
// queued.

mod payload;

pub use payload::{EMPTY_DYNAMIC_PAYLOAD, format_dynamic, pretty_json};

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::model::DeviceRecord;
use crate::ports::{DeviceDataProvider, PayloadCallback, PollPayload};

/// A payload received from the provider, tagged with its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveUpdate {
    pub generation: u64,
    pub device_id: String,
    pub payload: PollPayload,
}

impl LiveUpdate {
    /// Text to display for this delivery.
    pub fn display_text(&self) -> String {
        match &self.payload {
            PollPayload::Data(raw) => format_dynamic(raw),
            PollPayload::Error(message) => message.clone(),
        }
    }
}

#[derive(Debug)]
enum SessionState {
    Idle,
    Active { device: DeviceRecord, generation: u64 },
}

pub struct PollingSession {
    provider: Arc<dyn DeviceDataProvider>,
    state: SessionState,
    last_generation: u64,
    tx: mpsc::UnboundedSender<LiveUpdate>,
    rx: mpsc::UnboundedReceiver<LiveUpdate>,
}

impl PollingSession {
    pub fn new(provider: Arc<dyn DeviceDataProvider>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            provider,
            state: SessionState::Idle,
            last_generation: 0,
            tx,
            rx,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    /// Whether the active session (if any) is bound to `device_id`.
    pub fn is_active_for(&self, device_id: &str) -> bool {
        matches!(&self.state, SessionState::Active { device, .. } if device.device_id() == device_id)
    }

    pub fn active_device_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active { device, .. } => Some(device.device_id()),
            SessionState::Idle => None,
        }
    }

    fn current_generation(&self) -> Option<u64> {
        match self.state {
            SessionState::Active { generation, .. } => Some(generation),
            SessionState::Idle => None,
        }
    }

    /// Subscribe to live payloads for `device`, stopping any prior session
    /// first. Returns the new session's generation.
    pub fn start(&mut self, device: &DeviceRecord) -> Result<u64, CoreError> {
        self.stop();

        self.last_generation += 1;
        let generation = self.last_generation;
        let device_id = device.device_id().to_owned();
        let tx = self.tx.clone();
        let callback: PayloadCallback = Arc::new(move |payload| {
            // Receiver lives as long as the session manager; a send error
            // only happens during teardown.
            let _ = tx.send(LiveUpdate {
                generation,
                device_id: device_id.clone(),
                payload,
            });
        });

        self.provider.start_polling(device, callback)?;
        self.state = SessionState::Active {
            device: device.deep_copy(),
            generation,
        };
        debug!(device_id = device.device_id(), generation, "polling started");
        Ok(generation)
    }

    /// Stop the active session. Returns `false` (and does nothing) when idle.
    pub fn stop(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Active { device, generation } => {
                self.provider.stop_polling(&device);
                debug!(device_id = device.device_id(), generation, "polling stopped");
                true
            }
            SessionState::Idle => false,
        }
    }

    /// Next queued delivery from the active session, without waiting.
    /// Deliveries from stopped sessions are discarded.
    pub fn try_next(&mut self) -> Option<LiveUpdate> {
        let current = self.current_generation()?;
        while let Ok(update) = self.rx.try_recv() {
            if update.generation == current {
                return Some(update);
            }
            trace!(stale = update.generation, current, "dropping stale payload");
        }
        None
    }

    /// Wait for the next delivery from the active session. Returns `None`
    /// immediately when no session is active.
    pub async fn next(&mut self) -> Option<LiveUpdate> {
        let current = self.current_generation()?;
        loop {
            let update = self.rx.recv().await?;
            if update.generation == current {
                return Some(update);
            }
            trace!(stale = update.generation, current, "dropping stale payload");
        }
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        self.stop();
    }
}
