// src/testing.rs
//
// Test doubles for the native seams: windows, factory, host app, opener,
// clock and geometry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::time::Instant;

use crate::config_store::ConfigStore;
use crate::context_menu::MenuEntry;
use crate::platform::{Os, PlatformInfo};
use crate::window::geometry::GeometryStore;
use crate::window::options::WindowOptions;
use crate::window::registry::{RegistryDeps, WindowRegistry};
use crate::window::{Bounds, Clock, HostApp, NativeWindow, Opener, WindowFactory, WindowHandle};

#[derive(Clone, Debug)]
pub struct MockState {
    pub visible: bool,
    pub focused: bool,
    pub minimized: bool,
    pub maximized: bool,
    pub fullscreen: bool,
    pub on_top: bool,
    pub destroyed: bool,
    pub opacity: f64,
    pub muted: bool,
    pub zoom: f64,
    pub devtools: bool,
    pub bounds: Bounds,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            visible: true,
            focused: false,
            minimized: false,
            maximized: false,
            fullscreen: false,
            on_top: false,
            destroyed: false,
            opacity: 1.0,
            muted: false,
            zoom: 1.0,
            devtools: false,
            bounds: Bounds {
                x: 100.0,
                y: 100.0,
                width: 800.0,
                height: 600.0,
            },
        }
    }
}

/// Records every command as a string like `set_opacity(0)`.
pub struct MockWindow {
    label: String,
    state: Mutex<MockState>,
    calls: Mutex<Vec<String>>,
    emitted: Mutex<Vec<(String, Value)>>,
    menus: Mutex<Vec<Vec<MenuEntry>>>,
    pub close_fails: AtomicBool,
    destroys: AtomicUsize,
    destroyed_at: Mutex<Option<Instant>>,
}

impl MockWindow {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            state: Mutex::new(MockState::default()),
            calls: Mutex::new(Vec::new()),
            emitted: Mutex::new(Vec::new()),
            menus: Mutex::new(Vec::new()),
            close_fails: AtomicBool::new(false),
            destroys: AtomicUsize::new(0),
            destroyed_at: Mutex::new(None),
        })
    }

    pub fn handle(label: &str) -> WindowHandle {
        Self::new(label)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn set_state(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn state(&self) -> MockState {
        self.state.lock().unwrap().clone()
    }

    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn emitted_on(&self, channel: &str) -> Vec<Value> {
        self.emitted()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn menus(&self) -> Vec<Vec<MenuEntry>> {
        self.menus.lock().unwrap().clone()
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    pub fn destroyed_at(&self) -> Option<Instant> {
        *self.destroyed_at.lock().unwrap()
    }

    fn command(&self, call: String, f: impl FnOnce(&mut MockState)) -> Result<(), String> {
        let mut state = self.state.lock().unwrap();
        if state.destroyed {
            return Err(format!("'{}' is destroyed", self.label));
        }
        self.calls.lock().unwrap().push(call);
        f(&mut state);
        Ok(())
    }

    fn query(&self, f: impl FnOnce(&MockState) -> bool) -> bool {
        let state = self.state.lock().unwrap();
        !state.destroyed && f(&state)
    }
}

impl NativeWindow for MockWindow {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_destroyed(&self) -> bool {
        self.state.lock().unwrap().destroyed
    }

    fn is_visible(&self) -> bool {
        self.query(|s| s.visible)
    }

    fn is_focused(&self) -> bool {
        self.query(|s| s.focused)
    }

    fn is_minimized(&self) -> bool {
        self.query(|s| s.minimized)
    }

    fn is_maximized(&self) -> bool {
        self.query(|s| s.maximized)
    }

    fn is_fullscreen(&self) -> bool {
        self.query(|s| s.fullscreen)
    }

    fn is_always_on_top(&self) -> bool {
        self.query(|s| s.on_top)
    }

    fn bounds(&self) -> Option<Bounds> {
        let state = self.state.lock().unwrap();
        (!state.destroyed).then_some(state.bounds)
    }

    fn show(&self) -> Result<(), String> {
        self.command("show".into(), |s| s.visible = true)
    }

    fn hide(&self) -> Result<(), String> {
        self.command("hide".into(), |s| {
            s.visible = false;
            s.focused = false;
        })
    }

    fn focus(&self) -> Result<(), String> {
        self.command("focus".into(), |s| s.focused = true)
    }

    fn minimize(&self) -> Result<(), String> {
        self.command("minimize".into(), |s| {
            s.minimized = true;
            s.focused = false;
        })
    }

    fn restore(&self) -> Result<(), String> {
        self.command("restore".into(), |s| s.minimized = false)
    }

    fn maximize(&self) -> Result<(), String> {
        self.command("maximize".into(), |s| s.maximized = true)
    }

    fn unmaximize(&self) -> Result<(), String> {
        self.command("unmaximize".into(), |s| s.maximized = false)
    }

    fn set_fullscreen(&self, fullscreen: bool) -> Result<(), String> {
        self.command(format!("set_fullscreen({})", fullscreen), |s| {
            s.fullscreen = fullscreen
        })
    }

    fn set_always_on_top(&self, on_top: bool) -> Result<(), String> {
        self.command(format!("set_always_on_top({})", on_top), |s| s.on_top = on_top)
    }

    fn set_opacity(&self, opacity: f64) -> Result<(), String> {
        self.command(format!("set_opacity({})", opacity), |s| s.opacity = opacity)
    }

    fn set_visible_on_all_workspaces(&self, visible: bool) -> Result<(), String> {
        self.command(format!("set_visible_on_all_workspaces({})", visible), |_| {})
    }

    fn set_audio_muted(&self, muted: bool) -> Result<(), String> {
        self.command(format!("set_audio_muted({})", muted), |s| s.muted = muted)
    }

    fn set_zoom(&self, factor: f64) -> Result<(), String> {
        self.command(format!("set_zoom({})", factor), |s| s.zoom = factor)
    }

    fn is_devtools_open(&self) -> bool {
        self.query(|s| s.devtools)
    }

    fn open_devtools(&self) -> Result<(), String> {
        self.command("open_devtools".into(), |s| s.devtools = true)
    }

    fn close_devtools(&self) -> Result<(), String> {
        self.command("close_devtools".into(), |s| s.devtools = false)
    }

    fn reload(&self, ignore_cache: bool) -> Result<(), String> {
        self.command(format!("reload({})", ignore_cache), |_| {})
    }

    fn emit(&self, channel: &str, payload: Value) -> Result<(), String> {
        if self.is_destroyed() {
            return Err(format!("'{}' is destroyed", self.label));
        }
        self.emitted
            .lock()
            .unwrap()
            .push((channel.to_string(), payload));
        Ok(())
    }

    fn popup_menu(&self, entries: &[MenuEntry]) -> Result<(), String> {
        self.command("popup_menu".into(), |_| {})?;
        self.menus.lock().unwrap().push(entries.to_vec());
        Ok(())
    }

    fn close(&self) -> Result<(), String> {
        if self.close_fails.load(Ordering::SeqCst) {
            self.calls.lock().unwrap().push("close".into());
            return Err("close raced with teardown".into());
        }
        self.command("close".into(), |s| {
            s.visible = false;
            s.destroyed = true;
        })
    }

    fn destroy(&self) -> Result<(), String> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        *self.destroyed_at.lock().unwrap() = Some(Instant::now());
        self.command("destroy".into(), |s| {
            s.visible = false;
            s.destroyed = true;
        })
    }
}

#[derive(Default)]
pub struct MockFactory {
    created: Mutex<Vec<(String, WindowOptions)>>,
    windows: Mutex<Vec<Arc<MockWindow>>>,
    pub fail: AtomicBool,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Options of the most recent window created under `name`.
    pub fn options_for(&self, name: &str) -> Option<WindowOptions> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o.clone())
    }

    /// Most recent window created under `name`.
    pub fn window(&self, name: &str) -> Option<Arc<MockWindow>> {
        self.windows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|w| w.label == name)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.windows.lock().unwrap().len()
    }
}

impl WindowFactory for MockFactory {
    fn create(&self, name: &str, options: &WindowOptions) -> Result<WindowHandle, String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(format!("Failed to create window '{}': out of resources", name));
        }
        let window = MockWindow::new(name);
        window.set_state(|s| s.visible = options.visible);
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), options.clone()));
        self.windows.lock().unwrap().push(window.clone());
        Ok(window)
    }
}

type Deferred = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct MockHost {
    exits: Mutex<Vec<i32>>,
    quits: AtomicUsize,
    quitting: AtomicBool,
    app_hides: AtomicUsize,
    deferred: Mutex<Vec<Deferred>>,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn exits(&self) -> Vec<i32> {
        self.exits.lock().unwrap().clone()
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub fn set_quitting(&self, quitting: bool) {
        self.quitting.store(quitting, Ordering::SeqCst);
    }

    pub fn app_hides(&self) -> usize {
        self.app_hides.load(Ordering::SeqCst)
    }

    /// Run queued next-tick tasks. Returns how many ran.
    pub fn run_deferred(&self) -> usize {
        let tasks: Vec<Deferred> = std::mem::take(&mut *self.deferred.lock().unwrap());
        let n = tasks.len();
        for task in tasks {
            task();
        }
        n
    }
}

impl HostApp for MockHost {
    fn exit(&self, code: i32) {
        self.exits.lock().unwrap().push(code);
    }

    fn quit(&self) {
        self.quits.fetch_add(1, Ordering::SeqCst);
    }

    fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    fn hide_application(&self) {
        self.app_hides.fetch_add(1, Ordering::SeqCst);
    }

    fn defer(&self, task: Box<dyn FnOnce() + Send>) {
        self.deferred.lock().unwrap().push(task);
    }
}

#[derive(Default)]
pub struct MockOpener {
    urls: Mutex<Vec<String>>,
    paths: Mutex<Vec<PathBuf>>,
}

impl MockOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

impl Opener for MockOpener {
    fn open_url(&self, url: &str) -> Result<(), String> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn open_path(&self, path: &Path) -> Result<(), String> {
        self.paths.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_ms: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now_ms)))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MemoryGeometry {
    saved: Mutex<HashMap<String, Bounds>>,
}

impl MemoryGeometry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, name: &str, bounds: Bounds) {
        self.saved.lock().unwrap().insert(name.to_string(), bounds);
    }

    pub fn saved(&self, name: &str) -> Option<Bounds> {
        self.saved.lock().unwrap().get(name).copied()
    }
}

impl GeometryStore for MemoryGeometry {
    fn load(&self, name: &str) -> Option<Bounds> {
        self.saved(name)
    }

    fn manage(&self, name: &str, window: &dyn NativeWindow) {
        if let Some(bounds) = window.bounds() {
            self.put(name, bounds);
        }
    }
}

pub struct Fixture {
    pub registry: Arc<WindowRegistry>,
    pub factory: Arc<MockFactory>,
    pub host: Arc<MockHost>,
    pub config: Arc<ConfigStore>,
    pub geometry: Arc<MemoryGeometry>,
    pub clock: Arc<ManualClock>,
}

/// Registry wired to mocks. Must run inside a tokio runtime.
pub fn registry_fixture(os: Os) -> Fixture {
    let factory = MockFactory::new();
    let host = MockHost::new();
    let config = Arc::new(ConfigStore::in_memory());
    let geometry = MemoryGeometry::new();
    let clock = ManualClock::new(0);

    let registry = WindowRegistry::new(RegistryDeps {
        platform: PlatformInfo::new(os, false),
        factory: factory.clone(),
        host: host.clone(),
        config: config.clone(),
        geometry: geometry.clone(),
        clock: clock.clone(),
        runtime: tokio::runtime::Handle::current(),
    });

    Fixture {
        registry,
        factory,
        host,
        config,
        geometry,
        clock,
    }
}
