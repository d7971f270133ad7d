// src/window/handshake.rs
//
// Cooperative close: tell content to clean up, then destroy the window when it
// acknowledges or after SAFE_CLOSE_TIMEOUT, whichever comes first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::{send, WindowHandle};
use crate::ipc::HostMessage;

/// Upper bound on how long content may take to acknowledge a close.
pub const SAFE_CLOSE_TIMEOUT: Duration = Duration::from_millis(800);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    Acknowledged,
    TimedOut,
}

struct Pending {
    id: u64,
    ack: oneshot::Sender<()>,
}

pub struct SafeClose {
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    next_id: AtomicU64,
    runtime: Handle,
}

impl SafeClose {
    pub fn new(runtime: Handle) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            runtime,
        }
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending
            .lock()
            .map(|p| p.contains_key(name))
            .unwrap_or(false)
    }

    /// Start closing `window`. Returns false if a close is already in flight
    /// for `name`. `on_done` runs after the window has been destroyed.
    pub fn begin<F>(&self, name: &str, window: WindowHandle, on_done: F) -> bool
    where
        F: FnOnce(CloseOutcome) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let Ok(mut pending) = self.pending.lock() else {
                return false;
            };
            if pending.contains_key(name) {
                tlog!("[safe-close] '{}' is already closing", name);
                return false;
            }
            pending.insert(name.to_string(), Pending { id, ack: tx });
        }

        send(&window, &HostMessage::PrepareToClose);

        let pending = self.pending.clone();
        let name = name.to_string();
        self.runtime.spawn(async move {
            let outcome = match tokio::time::timeout(SAFE_CLOSE_TIMEOUT, rx).await {
                Ok(_) => CloseOutcome::Acknowledged,
                Err(_) => CloseOutcome::TimedOut,
            };

            // Drop our slot unless a newer close for the same name replaced it
            if let Ok(mut p) = pending.lock() {
                if p.get(&name).map_or(false, |entry| entry.id == id) {
                    p.remove(&name);
                }
            }

            if outcome == CloseOutcome::TimedOut {
                tlog!(
                    "[safe-close] '{}' did not acknowledge within {}ms, destroying",
                    name,
                    SAFE_CLOSE_TIMEOUT.as_millis()
                );
            }
            if let Err(e) = window.destroy() {
                tlog!("[safe-close] Failed to destroy '{}': {}", name, e);
            }
            on_done(outcome);
        });
        true
    }

    /// Content finished its cleanup. Returns false if nothing was waiting.
    pub fn acknowledge(&self, name: &str) -> bool {
        let entry = self.pending.lock().ok().and_then(|mut p| p.remove(name));
        match entry {
            Some(entry) => entry.ack.send(()).is_ok(),
            None => false,
        }
    }
}
