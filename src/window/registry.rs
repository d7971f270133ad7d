//! The window registry.
//!
//! Single authority for which windows exist. Every lifecycle operation looks
//! the window up by name or handle and quietly does nothing when it is gone;
//! only window creation reports errors.
//!
//! The table lock is never held while calling into a native window, the
//! factory or the host: those calls can re-enter the registry synchronously.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;

use super::activation::{self, ActivationStrategy};
use super::crash::CrashVerdict;
use super::geometry::GeometryStore;
use super::handshake::{CloseOutcome, SafeClose};
use super::health::{HealthMonitor, PingOutcome, PING_INTERVAL};
use super::options::{WindowOptions, WindowOverrides};
use super::presets;
use super::table::{FirstLoadTask, WindowEntry, WindowTable};
use super::{
    send, same_window, Clock, CloseDecision, HostApp, WindowEvent, WindowFactory, WindowHandle,
};
use crate::config_store::ConfigAccessor;
use crate::context_menu::{ContextMenuProvider, MenuAction};
use crate::ipc::{ContentMessage, HostMessage};
use crate::platform::PlatformInfo;
use crate::settings;

/// A window addressed by name or by handle identity.
#[derive(Clone, Copy)]
pub enum WindowRef<'a> {
    Name(&'a str),
    Handle(&'a WindowHandle),
}

impl<'a> From<&'a str> for WindowRef<'a> {
    fn from(name: &'a str) -> Self {
        WindowRef::Name(name)
    }
}

impl<'a> From<&'a String> for WindowRef<'a> {
    fn from(name: &'a String) -> Self {
        WindowRef::Name(name.as_str())
    }
}

impl<'a> From<&'a WindowHandle> for WindowRef<'a> {
    fn from(handle: &'a WindowHandle) -> Self {
        WindowRef::Handle(handle)
    }
}

/// Collaborators the registry is built from.
pub struct RegistryDeps {
    pub platform: PlatformInfo,
    pub factory: Arc<dyn WindowFactory>,
    pub host: Arc<dyn HostApp>,
    pub config: Arc<dyn ConfigAccessor>,
    pub geometry: Arc<dyn GeometryStore>,
    pub clock: Arc<dyn Clock>,
    pub runtime: Handle,
}

pub struct WindowRegistry {
    me: Weak<WindowRegistry>,
    platform: PlatformInfo,
    factory: Arc<dyn WindowFactory>,
    host: Arc<dyn HostApp>,
    config: Arc<dyn ConfigAccessor>,
    geometry: Arc<dyn GeometryStore>,
    clock: Arc<dyn Clock>,
    activation: Box<dyn ActivationStrategy>,
    table: Mutex<WindowTable>,
    safe_close: SafeClose,
    health: HealthMonitor,
    menus: ContextMenuProvider,
    runtime: Handle,
}

fn log_err(name: &str, what: &str, result: Result<(), String>) {
    if let Err(e) = result {
        tlog!("[registry] {} failed for '{}': {}", what, name, e);
    }
}

impl WindowRegistry {
    pub fn new(deps: RegistryDeps) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            activation: activation::for_os(deps.platform.os),
            platform: deps.platform,
            factory: deps.factory,
            host: deps.host,
            config: deps.config,
            geometry: deps.geometry,
            clock: deps.clock,
            table: Mutex::new(WindowTable::new()),
            safe_close: SafeClose::new(deps.runtime.clone()),
            health: HealthMonitor::new(),
            menus: ContextMenuProvider::new(),
            runtime: deps.runtime,
        })
    }

    fn table(&self) -> MutexGuard<'_, WindowTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Name and handle of a registered window, alive or not.
    fn lookup(&self, id: WindowRef<'_>) -> Option<(String, WindowHandle)> {
        let table = self.table();
        let entry = match id {
            WindowRef::Name(name) => table.get(name),
            WindowRef::Handle(handle) => table.find_by_handle(handle),
        }?;
        Some((entry.name.clone(), entry.handle.clone()))
    }

    /// Like `lookup`, but only for windows that have not been destroyed.
    fn resolve(&self, id: WindowRef<'_>) -> Option<(String, WindowHandle)> {
        self.lookup(id).filter(|(_, handle)| !handle.is_destroyed())
    }

    pub fn get_window<'a>(&self, id: impl Into<WindowRef<'a>>) -> Option<WindowHandle> {
        self.resolve(id.into()).map(|(_, handle)| handle)
    }

    pub fn get_window_name(&self, handle: &WindowHandle) -> Option<String> {
        self.table().find_by_handle(handle).map(|e| e.name.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.table().names()
    }

    pub fn windows(&self) -> Vec<WindowHandle> {
        self.table().handles()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table().get(name).is_some()
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    fn resolve_options(&self, name: &str, overrides: WindowOverrides) -> WindowOptions {
        let mut options = WindowOptions::platform_defaults(&self.platform).merge(overrides);
        if options.user_agent.is_none() {
            options.user_agent = settings::user_agent(self.config.as_ref());
        }
        if settings::debug_enabled(self.config.as_ref()) {
            options.devtools = true;
        }
        if presets::is_one_off(name) {
            return options;
        }
        options.with_bounds(self.geometry.load(name))
    }

    /// Persist bounds for windows whose name comes back next session.
    fn persist_geometry(&self, name: &str, window: &WindowHandle) {
        if !presets::is_one_off(name) {
            self.geometry.manage(name, window.as_ref());
        }
    }

    /// Create the window `name`, or bring the existing one forward.
    ///
    /// A live window under `name` is shown, focused and returned as-is, so
    /// repeated calls always yield the identical handle.
    pub fn create_window(
        &self,
        name: &str,
        overrides: WindowOverrides,
    ) -> Result<WindowHandle, String> {
        if let Some((_, existing)) = self.lookup(WindowRef::Name(name)) {
            if !existing.is_destroyed() {
                self.show_window(name);
                return Ok(existing);
            }
            // Destroyed without a Closed event; drop the stale entry
            tlog!("[registry] Replacing destroyed window '{}'", name);
            self.evict(name);
        }

        let options = self.resolve_options(name, overrides);
        let handle = self.factory.create(name, &options)?;

        let mut entry = WindowEntry::new(name, handle.clone());
        entry.answers_pings = !presets::is_one_off(name) && options.loads_bundled_content();
        let inserted = self.table().insert(entry);
        if inserted.is_err() {
            // Someone else registered `name` while the factory was running
            tlog!("[registry] Lost creation race for '{}', keeping the first window", name);
            log_err(name, "destroy", handle.destroy());
            return self
                .get_window(name)
                .ok_or_else(|| format!("Window '{}' vanished during creation", name));
        }

        self.menus.attach(name);
        tlog!(
            "[registry] Created '{}' ({}x{}, partition {:?})",
            name,
            options.width,
            options.height,
            options.partition
        );
        Ok(handle)
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    pub fn show_window<'a>(&self, id: impl Into<WindowRef<'a>>) -> bool {
        let Some((name, window)) = self.resolve(id.into()) else {
            return false;
        };

        if window.is_minimized() {
            log_err(&name, "restore", window.restore());
        }

        let stale_fullscreen = self
            .table()
            .get_mut(&name)
            .map(|e| std::mem::take(&mut e.hidden_while_fullscreen))
            .unwrap_or(false);
        if stale_fullscreen {
            log_err(&name, "set_fullscreen", window.set_fullscreen(false));
        }

        self.activation.show(&window, &self.host);
        log_err(&name, "set_audio_muted", window.set_audio_muted(false));
        true
    }

    pub fn hide_window<'a>(&self, id: impl Into<WindowRef<'a>>) -> bool {
        let Some((name, window)) = self.resolve(id.into()) else {
            return false;
        };

        log_err(&name, "set_audio_muted", window.set_audio_muted(true));
        let fullscreen = window.is_fullscreen();
        if let Some(entry) = self.table().get_mut(&name) {
            entry.hidden_while_fullscreen = fullscreen;
        }
        self.activation.hide(&window, &self.host);
        self.health.reset(&name);
        true
    }

    pub fn toggle_window<'a>(&self, id: impl Into<WindowRef<'a>>) -> bool {
        let id = id.into();
        let Some((_, window)) = self.resolve(id) else {
            return false;
        };
        if window.is_visible() && !window.is_minimized() {
            self.hide_window(id)
        } else {
            self.show_window(id)
        }
    }

    pub fn show_all(&self) {
        for name in self.names() {
            self.show_window(&name);
        }
    }

    pub fn hide_all(&self) {
        for name in self.names() {
            self.hide_window(&name);
        }
    }

    /// Any window visible hides everything, otherwise everything is shown.
    pub fn toggle_all(&self) {
        let any_visible = self
            .windows()
            .iter()
            .any(|w| !w.is_destroyed() && w.is_visible());
        if any_visible {
            self.hide_all();
        } else {
            self.show_all();
        }
    }

    // ------------------------------------------------------------------
    // Close / reload
    // ------------------------------------------------------------------

    /// Close a window, destroying it if the close fails. The entry is removed
    /// whichever way the window went.
    pub fn close_window<'a>(&self, id: impl Into<WindowRef<'a>>) -> bool {
        let Some((name, window)) = self.lookup(id.into()) else {
            return false;
        };

        if !window.is_destroyed() {
            if let Err(e) = window.close() {
                tlog!("[registry] Close failed for '{}' ({}), destroying", name, e);
                log_err(&name, "destroy", window.destroy());
            }
        }
        self.forget(&name);
        true
    }

    pub fn close_all(&self) {
        for name in self.names() {
            self.close_window(&name);
        }
    }

    pub fn reload_window<'a>(&self, id: impl Into<WindowRef<'a>>, force: bool) -> bool {
        let Some((name, window)) = self.resolve(id.into()) else {
            return false;
        };
        self.health.reset(&name);
        log_err(&name, "reload", window.reload(force));
        true
    }

    pub fn reload_all(&self, force: bool) {
        for name in self.names() {
            self.reload_window(&name, force);
        }
    }

    /// The single way an entry leaves the table.
    fn evict(&self, name: &str) -> Option<WindowEntry> {
        let entry = self.table().remove(name)?;
        self.menus.detach(name);
        self.health.reset(name);
        tlog!("[registry] Removed '{}'", name);
        Some(entry)
    }

    /// Evict `name`; if that drained the table during shutdown, finish quitting.
    fn forget(&self, name: &str) {
        if self.evict(name).is_none() {
            return;
        }
        if self.host.is_quitting() && self.table().is_empty() {
            tlog!("[registry] Last window gone while quitting");
            self.host.quit();
        }
    }

    // ------------------------------------------------------------------
    // First load
    // ------------------------------------------------------------------

    pub fn is_loaded(&self, name: &str) -> bool {
        self.table().get(name).map_or(false, |e| e.loaded)
    }

    /// Run `task` once the window's content has loaded; immediately if it
    /// already has. Returns false if there is no such window.
    pub fn on_first_load(&self, name: &str, task: FirstLoadTask) -> bool {
        let ready = {
            let mut table = self.table();
            let Some(entry) = table.get_mut(name) else {
                return false;
            };
            if entry.loaded {
                Some((task, entry.handle.clone()))
            } else {
                entry.first_load_tasks.push(task);
                None
            }
        };
        if let Some((task, handle)) = ready {
            task(handle);
        }
        true
    }

    // ------------------------------------------------------------------
    // Native events
    // ------------------------------------------------------------------

    pub fn handle_event(&self, name: &str, event: WindowEvent) {
        match event {
            WindowEvent::Resized { width, height } => self.on_resized(name, width, height),
            WindowEvent::Moved { .. } => {
                if let Some(window) = self.get_window(name) {
                    self.persist_geometry(name, &window);
                }
            }
            WindowEvent::Focused(_) => {}
            WindowEvent::ContentLoaded => self.on_content_loaded(name),
            WindowEvent::RendererCrashed => self.on_renderer_crashed(name),
            WindowEvent::Closed => self.forget(name),
        }
    }

    fn on_resized(&self, name: &str, width: f64, height: f64) {
        let Some(window) = self.get_window(name) else {
            return;
        };
        send(&window, &HostMessage::Resized { width, height });

        let maximized = window.is_maximized();
        let fullscreen = window.is_fullscreen();
        let (max_changed, fs_changed) = match self.table().get_mut(name) {
            Some(entry) => {
                let changed = (entry.maximized != maximized, entry.fullscreen != fullscreen);
                entry.maximized = maximized;
                entry.fullscreen = fullscreen;
                changed
            }
            None => return,
        };
        if max_changed {
            send(&window, &HostMessage::Maximized(maximized));
        }
        if fs_changed {
            send(&window, &HostMessage::Fullscreen(fullscreen));
        }
        self.persist_geometry(name, &window);
    }

    fn on_content_loaded(&self, name: &str) {
        let Some(window) = self.get_window(name) else {
            return;
        };

        log_err(name, "set_zoom", window.set_zoom(settings::zoom_factor(self.config.as_ref())));
        if settings::debug_enabled(self.config.as_ref()) && !window.is_devtools_open() {
            log_err(name, "open_devtools", window.open_devtools());
        }

        let tasks = match self.table().get_mut(name) {
            Some(entry) => {
                entry.loaded = true;
                std::mem::take(&mut entry.first_load_tasks)
            }
            None => return,
        };
        for task in tasks {
            task(window.clone());
        }
    }

    /// Content process died: reload once, exit on a crash loop.
    fn on_renderer_crashed(&self, name: &str) {
        let now = self.clock.now_millis();
        let (verdict, window) = {
            let mut table = self.table();
            let Some(entry) = table.get_mut(name) else {
                return;
            };
            (entry.crash.record(now), entry.handle.clone())
        };

        match verdict {
            CrashVerdict::Reload => {
                tlog!("[registry] Content of '{}' crashed, reloading", name);
                self.health.reset(name);
                log_err(name, "reload", window.reload(false));
            }
            CrashVerdict::Fatal => {
                tlog!("[registry] '{}' crashed twice within a minute, exiting", name);
                self.evict(name);
                self.host.exit(1);
            }
        }
    }

    /// Native close request (title bar button, Cmd+W, Alt+F4).
    pub fn on_close_requested(&self, name: &str) -> CloseDecision {
        let Some(window) = self.get_window(name) else {
            return CloseDecision::Proceed;
        };
        if self.safe_close.is_pending(name) {
            return CloseDecision::Prevent;
        }

        let me = self.me.clone();
        let closing = name.to_string();
        self.safe_close.begin(name, window, move |outcome| {
            if outcome == CloseOutcome::TimedOut {
                tlog!("[registry] '{}' closed without acknowledgement", closing);
            }
            if let Some(registry) = me.upgrade() {
                registry.forget(&closing);
            }
        });
        CloseDecision::Prevent
    }

    // ------------------------------------------------------------------
    // Content requests
    // ------------------------------------------------------------------

    /// Window-control requests from content. `OpenWindow` belongs to the
    /// navigation guard and is ignored here.
    pub fn handle_message(&self, name: &str, message: ContentMessage) {
        if let ContentMessage::PrepareToCloseAck = message {
            if !self.safe_close.acknowledge(name) {
                tlog!("[registry] Unexpected close acknowledgement from '{}'", name);
            }
            return;
        }
        if let ContentMessage::Pong(counter) = message {
            self.health.pong(name, counter);
            return;
        }

        let Some(window) = self.get_window(name) else {
            return;
        };
        match message {
            ContentMessage::RequestPin => {
                let on_top = !window.is_always_on_top();
                log_err(name, "set_always_on_top", window.set_always_on_top(on_top));
            }
            ContentMessage::RequestMinimize => log_err(name, "minimize", window.minimize()),
            ContentMessage::RequestMaximize => {
                if window.is_maximized() {
                    log_err(name, "unmaximize", window.unmaximize());
                } else {
                    log_err(name, "maximize", window.maximize());
                }
            }
            ContentMessage::RequestClose => {
                self.close_window(name);
            }
            ContentMessage::ContextMenu(params) => {
                if let Some(entries) = self.menus.menu_for(name, &params) {
                    log_err(name, "popup_menu", window.popup_menu(&entries));
                }
            }
            ContentMessage::OpenWindow { .. }
            | ContentMessage::PrepareToCloseAck
            | ContentMessage::Pong(_) => {}
        }
    }

    /// A custom context-menu entry was clicked in window `name`.
    pub fn handle_menu_action(&self, name: &str, id: &str) -> bool {
        let Some(action) = MenuAction::from_id(id) else {
            return false;
        };
        let Some(window) = self.get_window(name) else {
            return false;
        };
        match action {
            MenuAction::ReplaceMisspelling(word) => {
                send(&window, &HostMessage::ReplaceMisspelling(word));
            }
            MenuAction::LearnSpelling(word) => {
                send(&window, &HostMessage::LearnSpelling(word));
            }
            MenuAction::ToggleDevTools => {
                if window.is_devtools_open() {
                    log_err(name, "close_devtools", window.close_devtools());
                } else {
                    log_err(name, "open_devtools", window.open_devtools());
                }
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// One ping round over visible, loaded windows that host bundled
    /// content. Windows with devtools open are skipped (paused debugger).
    pub fn ping_windows(&self) {
        let targets: Vec<(String, WindowHandle)> = self
            .table()
            .iter()
            .filter(|e| e.loaded && e.answers_pings)
            .map(|e| (e.name.clone(), e.handle.clone()))
            .collect();

        for (name, window) in targets {
            if window.is_destroyed() || !window.is_visible() || window.is_devtools_open() {
                continue;
            }
            match self.health.tick(&name) {
                PingOutcome::Ping(counter) => {
                    send(&window, &HostMessage::Ping(counter));
                }
                PingOutcome::Unresponsive => self.on_unresponsive(&name, &window),
            }
        }
    }

    /// A window stopped answering pings. Reload it; crash-loop accounting is
    /// reserved for real renderer crashes.
    fn on_unresponsive(&self, name: &str, window: &WindowHandle) {
        tlog!("[registry] '{}' stopped answering, reloading", name);
        self.health.reset(name);
        log_err(name, "reload", window.reload(false));
    }

    /// Ping every PING_INTERVAL until the registry is dropped.
    pub fn start_health_watchdog(&self) {
        let me = self.me.clone();
        self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(PING_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(registry) = me.upgrade() else {
                    break;
                };
                registry.ping_windows();
            }
        });
    }

    /// True when `handle` is the window registered under `name`.
    pub fn is_window(&self, name: &str, handle: &WindowHandle) -> bool {
        self.table()
            .get(name)
            .map_or(false, |e| same_window(&e.handle, handle))
    }
}
