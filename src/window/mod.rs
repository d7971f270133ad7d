// src/window/mod.rs
//
// Window lifecycle core: the native window seam, the registry that owns every
// live window, and the pieces it is built from.

pub mod activation;
pub mod crash;
pub mod geometry;
pub mod handshake;
pub mod health;
pub mod options;
pub mod presets;
pub mod registry;
pub mod table;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::context_menu::MenuEntry;
use crate::ipc::HostMessage;
use options::WindowOptions;

/// Window position and size in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One native OS window and the content surface it hosts.
///
/// Queries on a destroyed window return `false`/`None`; commands return an
/// error that callers in the registry log and swallow.
pub trait NativeWindow: Send + Sync {
    fn label(&self) -> String;
    fn is_destroyed(&self) -> bool;
    fn is_visible(&self) -> bool;
    fn is_focused(&self) -> bool;
    fn is_minimized(&self) -> bool;
    fn is_maximized(&self) -> bool;
    fn is_fullscreen(&self) -> bool;
    fn is_always_on_top(&self) -> bool;
    fn bounds(&self) -> Option<Bounds>;

    fn show(&self) -> Result<(), String>;
    fn hide(&self) -> Result<(), String>;
    fn focus(&self) -> Result<(), String>;
    fn minimize(&self) -> Result<(), String>;
    /// Undo a minimize.
    fn restore(&self) -> Result<(), String>;
    fn maximize(&self) -> Result<(), String>;
    fn unmaximize(&self) -> Result<(), String>;
    fn set_fullscreen(&self, fullscreen: bool) -> Result<(), String>;
    fn set_always_on_top(&self, on_top: bool) -> Result<(), String>;
    /// 0.0 (transparent) to 1.0 (opaque).
    fn set_opacity(&self, opacity: f64) -> Result<(), String>;
    fn set_visible_on_all_workspaces(&self, visible: bool) -> Result<(), String>;
    fn set_audio_muted(&self, muted: bool) -> Result<(), String>;
    fn set_zoom(&self, factor: f64) -> Result<(), String>;
    fn is_devtools_open(&self) -> bool;
    fn open_devtools(&self) -> Result<(), String>;
    fn close_devtools(&self) -> Result<(), String>;

    fn reload(&self, ignore_cache: bool) -> Result<(), String>;
    /// Deliver a message to the content surface.
    fn emit(&self, channel: &str, payload: serde_json::Value) -> Result<(), String>;
    fn popup_menu(&self, entries: &[MenuEntry]) -> Result<(), String>;

    /// Ask the window to close; may fire a close request first.
    fn close(&self) -> Result<(), String>;
    /// Tear the window down immediately.
    fn destroy(&self) -> Result<(), String>;
}

/// Shared, identity-comparable reference to a native window.
pub type WindowHandle = Arc<dyn NativeWindow>;

/// Identity comparison on the underlying window object.
pub fn same_window(a: &WindowHandle, b: &WindowHandle) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Send a typed host message, logging delivery failures.
pub fn send(window: &WindowHandle, message: &HostMessage) -> bool {
    match window.emit(message.channel(), message.payload()) {
        Ok(()) => true,
        Err(e) => {
            tlog!(
                "[window] Failed to send '{}' to '{}': {}",
                message.channel(),
                window.label(),
                e
            );
            false
        }
    }
}

/// Builds native windows. Errors are real failures (resource exhaustion,
/// missing webview runtime) and propagate to the caller of `create_window`.
pub trait WindowFactory: Send + Sync {
    fn create(&self, name: &str, options: &WindowOptions) -> Result<WindowHandle, String>;
}

/// Application-level controls of the host process.
pub trait HostApp: Send + Sync {
    /// Terminate immediately with `code`.
    fn exit(&self, code: i32);
    /// Orderly shutdown (status 0).
    fn quit(&self);
    /// Whether a quit has been requested and windows are being torn down.
    fn is_quitting(&self) -> bool;
    /// Hide the whole application (macOS dock-level hide).
    fn hide_application(&self);
    /// Run `task` on the next turn of the UI event loop.
    fn defer(&self, task: Box<dyn FnOnce() + Send>);
}

/// OS handlers for things the host refuses to render itself.
pub trait Opener: Send + Sync {
    fn open_url(&self, url: &str) -> Result<(), String>;
    fn open_path(&self, path: &Path) -> Result<(), String>;
}

/// Wall clock in milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Events the backend reports for a window, keyed by window name.
#[derive(Clone, Debug, PartialEq)]
pub enum WindowEvent {
    Resized { width: f64, height: f64 },
    Moved { x: f64, y: f64 },
    Focused(bool),
    /// Content finished loading (every load, not only the first)
    ContentLoaded,
    /// Content process died
    RendererCrashed,
    /// Terminal: the native window is gone
    Closed,
}

/// Answer to a native close request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseDecision {
    /// Let the platform close the window now.
    Proceed,
    /// Keep the window; the host closes it itself once content is done.
    Prevent,
}
