// src/desktop/host.rs

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tauri::AppHandle;
use tauri_plugin_opener::OpenerExt;

use crate::window::{HostApp, Opener};

pub struct TauriHost {
    app: AppHandle,
    quitting: AtomicBool,
}

impl TauriHost {
    pub fn new(app: AppHandle) -> Self {
        Self {
            app,
            quitting: AtomicBool::new(false),
        }
    }

    /// Mark the host as quitting. Returns false if a quit was already underway.
    pub fn begin_quit(&self) -> bool {
        !self.quitting.swap(true, Ordering::SeqCst)
    }
}

impl HostApp for TauriHost {
    fn exit(&self, code: i32) {
        tlog!("[host] Exiting with status {}", code);
        self.app.exit(code);
    }

    fn quit(&self) {
        self.quitting.store(true, Ordering::SeqCst);
        self.app.exit(0);
    }

    fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    fn hide_application(&self) {
        #[cfg(target_os = "macos")]
        if let Err(e) = self.app.hide() {
            tlog!("[host] Failed to hide application: {}", e);
        }
    }

    fn defer(&self, task: Box<dyn FnOnce() + Send>) {
        if let Err(e) = self.app.run_on_main_thread(task) {
            tlog!("[host] Failed to schedule on main thread: {}", e);
        }
    }
}

pub struct TauriOpener {
    app: AppHandle,
}

impl TauriOpener {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl Opener for TauriOpener {
    fn open_url(&self, url: &str) -> Result<(), String> {
        self.app
            .opener()
            .open_url(url, None::<&str>)
            .map_err(|e| format!("Failed to open {}: {}", url, e))
    }

    fn open_path(&self, path: &Path) -> Result<(), String> {
        self.app
            .opener()
            .open_path(path.to_string_lossy(), None::<&str>)
            .map_err(|e| format!("Failed to open {}: {}", path.display(), e))
    }
}
