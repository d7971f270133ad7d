// src/window/geometry.rs
//
// Per-window position/size persistence. One JSON file per window name,
// written atomically like the config store.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Bounds, NativeWindow};

pub trait GeometryStore: Send + Sync {
    /// Last saved bounds for `name`.
    fn load(&self, name: &str) -> Option<Bounds>;
    /// Record the current bounds of `window`. Called on move/resize.
    fn manage(&self, name: &str, window: &dyn NativeWindow);
}

pub struct JsonGeometryStore {
    dir: PathBuf,
}

impl JsonGeometryStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }

    pub fn save(&self, name: &str, bounds: &Bounds) -> Result<(), String> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create window state dir: {}", e))?;

        let path = self.path_for(name);
        let json = serde_json::to_string(bounds)
            .map_err(|e| format!("Failed to serialise bounds: {}", e))?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(|e| format!("Failed to write temp file: {}", e))?;
        fs::rename(&temp_path, &path).map_err(|e| format!("Failed to rename temp file: {}", e))
    }
}

impl GeometryStore for JsonGeometryStore {
    fn load(&self, name: &str) -> Option<Bounds> {
        let content = fs::read_to_string(self.path_for(name)).ok()?;
        match serde_json::from_str::<Bounds>(&content) {
            Ok(b) if b.width > 0.0 && b.height > 0.0 => Some(b),
            Ok(_) => None,
            Err(e) => {
                tlog!("[geometry] Ignoring corrupt state for '{}': {}", name, e);
                None
            }
        }
    }

    fn manage(&self, name: &str, window: &dyn NativeWindow) {
        // Only the normal (restored) geometry is worth restoring
        if window.is_destroyed()
            || window.is_minimized()
            || window.is_maximized()
            || window.is_fullscreen()
        {
            return;
        }
        if let Some(bounds) = window.bounds() {
            if let Err(e) = self.save(name, &bounds) {
                tlog!("[geometry] Failed to save '{}': {}", name, e);
            }
        }
    }
}
