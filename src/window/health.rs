// src/window/health.rs
//
// Content process liveness pings. The host pings each visible window and
// content answers with the same counter. Misses only count once a window has
// answered at least one ping; a window that then goes silent is reloaded.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Interval between ping rounds.
pub const PING_INTERVAL: Duration = Duration::from_secs(5);

/// Unanswered pings tolerated before the content process is declared dead.
pub const MAX_MISSED_PINGS: u64 = 3;

#[derive(Default)]
struct PingState {
    ping_counter: u64,
    last_pong_counter: u64,
    /// Set by the first pong
    armed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PingOutcome {
    /// Send a ping carrying this counter
    Ping(u64),
    /// Too many pings went unanswered
    Unresponsive,
}

#[derive(Default)]
pub struct HealthMonitor {
    states: Mutex<HashMap<String, PingState>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the ping counter for `name`.
    pub fn tick(&self, name: &str) -> PingOutcome {
        let Ok(mut states) = self.states.lock() else {
            return PingOutcome::Ping(0);
        };
        let state = states.entry(name.to_string()).or_default();
        state.ping_counter += 1;
        if !state.armed {
            return PingOutcome::Ping(state.ping_counter);
        }
        let misses = state.ping_counter.saturating_sub(state.last_pong_counter);

        if misses > MAX_MISSED_PINGS {
            tlog!(
                "[health] '{}': {} pings with no pong, content process appears dead",
                name,
                misses - 1
            );
            states.remove(name);
            PingOutcome::Unresponsive
        } else {
            PingOutcome::Ping(state.ping_counter)
        }
    }

    pub fn pong(&self, name: &str, counter: u64) {
        if let Ok(mut states) = self.states.lock() {
            if let Some(state) = states.get_mut(name) {
                if counter <= state.ping_counter {
                    state.last_pong_counter = state.last_pong_counter.max(counter);
                    state.armed = true;
                }
            }
        }
    }

    /// Forget ping history (window hidden, reloaded or gone).
    pub fn reset(&self, name: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(name);
        }
    }
}
