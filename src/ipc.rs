// src/ipc.rs
//
// Host <-> content message contract. Content sends `(channel, payload)` pairs
// through the `host_message` command; the host emits events on the channels
// below.

use serde_json::{json, Value};

use crate::context_menu::ContextParams;

pub mod channels {
    // Host -> content
    pub const WINDOW_RESIZED: &str = "window:resized";
    pub const WINDOW_MAXIMIZED: &str = "window:maximized";
    pub const WINDOW_FULLSCREEN: &str = "window:fullscreen";
    pub const PREPARE_TO_CLOSE: &str = "window:prepare-to-close";
    pub const BROWSER_NAVIGATE: &str = "browser:navigate";
    pub const HOST_PING: &str = "host:ping";
    pub const REPLACE_MISSPELLING: &str = "edit:replace-misspelling";
    pub const LEARN_SPELLING: &str = "edit:learn-spelling";

    // Content -> host
    pub const PREPARE_TO_CLOSE_ACK: &str = "window:prepare-to-close-ack";
    pub const REQUEST_PIN: &str = "window:pin";
    pub const REQUEST_MINIMIZE: &str = "window:minimize";
    pub const REQUEST_MAXIMIZE: &str = "window:maximize";
    pub const REQUEST_CLOSE: &str = "window:close";
    pub const OPEN_WINDOW: &str = "window:open";
    pub const CONTEXT_MENU: &str = "window:context-menu";
    pub const HOST_PONG: &str = "host:pong";
}

/// Messages the host sends to a content surface.
#[derive(Clone, Debug, PartialEq)]
pub enum HostMessage {
    Resized { width: f64, height: f64 },
    Maximized(bool),
    Fullscreen(bool),
    PrepareToClose,
    Navigate(String),
    Ping(u64),
    ReplaceMisspelling(String),
    LearnSpelling(String),
}

impl HostMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            HostMessage::Resized { .. } => channels::WINDOW_RESIZED,
            HostMessage::Maximized(_) => channels::WINDOW_MAXIMIZED,
            HostMessage::Fullscreen(_) => channels::WINDOW_FULLSCREEN,
            HostMessage::PrepareToClose => channels::PREPARE_TO_CLOSE,
            HostMessage::Navigate(_) => channels::BROWSER_NAVIGATE,
            HostMessage::Ping(_) => channels::HOST_PING,
            HostMessage::ReplaceMisspelling(_) => channels::REPLACE_MISSPELLING,
            HostMessage::LearnSpelling(_) => channels::LEARN_SPELLING,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            HostMessage::Resized { width, height } => json!({ "width": width, "height": height }),
            HostMessage::Maximized(b) | HostMessage::Fullscreen(b) => json!(b),
            HostMessage::PrepareToClose => Value::Null,
            HostMessage::Navigate(url) => json!({ "url": url }),
            HostMessage::Ping(counter) => json!(counter),
            HostMessage::ReplaceMisspelling(word) | HostMessage::LearnSpelling(word) => {
                json!(word)
            }
        }
    }
}

/// Messages a content surface sends to the host.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentMessage {
    PrepareToCloseAck,
    /// Toggle always-on-top
    RequestPin,
    RequestMinimize,
    /// Toggle maximized
    RequestMaximize,
    RequestClose,
    OpenWindow { url: String },
    ContextMenu(ContextParams),
    Pong(u64),
}

impl ContentMessage {
    pub fn parse(channel: &str, payload: Value) -> Result<Self, String> {
        match channel {
            channels::PREPARE_TO_CLOSE_ACK => Ok(ContentMessage::PrepareToCloseAck),
            channels::REQUEST_PIN => Ok(ContentMessage::RequestPin),
            channels::REQUEST_MINIMIZE => Ok(ContentMessage::RequestMinimize),
            channels::REQUEST_MAXIMIZE => Ok(ContentMessage::RequestMaximize),
            channels::REQUEST_CLOSE => Ok(ContentMessage::RequestClose),
            channels::OPEN_WINDOW => {
                // Accept both a bare string and `{ "url": ... }`
                let url = match &payload {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(map) => map.get("url").and_then(|u| u.as_str()).map(String::from),
                    _ => None,
                };
                url.map(|url| ContentMessage::OpenWindow { url })
                    .ok_or_else(|| format!("'{}' needs a url", channel))
            }
            channels::CONTEXT_MENU => serde_json::from_value(payload)
                .map(ContentMessage::ContextMenu)
                .map_err(|e| format!("Invalid context menu params: {}", e)),
            channels::HOST_PONG => payload
                .as_u64()
                .map(ContentMessage::Pong)
                .ok_or_else(|| format!("'{}' needs a counter", channel)),
            other => Err(format!("Unknown channel '{}'", other)),
        }
    }
}
