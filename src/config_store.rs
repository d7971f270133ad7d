// src/config_store.rs
//
// Persisted key-value settings shared by every window.
// Data is cached in memory and persisted to disk with debounced writes.
// The registry only reads through `ConfigAccessor`; writes come from the
// content side (settings screens) or from startup migration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Delay between the last write and the flush to disk.
const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Read/write access to persisted settings.
pub trait ConfigAccessor: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), String>;
}

/// Read `key` and deserialise it, falling back to `default` when the key is
/// missing or holds a value of the wrong shape.
pub fn get_or<T: serde::de::DeserializeOwned>(
    config: &dyn ConfigAccessor,
    key: &str,
    default: T,
) -> T {
    config
        .get(key)
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or(default)
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(flatten)]
    entries: HashMap<String, serde_json::Value>,
}

struct StoreState {
    data: StoreData,
    store_path: Option<PathBuf>,
    /// Whether there are unsaved changes
    dirty: bool,
    last_save: Instant,
}

/// JSON-file backed settings store.
pub struct ConfigStore {
    state: Arc<RwLock<StoreState>>,
    save_tx: Option<mpsc::UnboundedSender<()>>,
}

// ============================================================================
// Internal Functions
// ============================================================================

fn load_from_disk(path: &Path) -> Result<StoreData, String> {
    if !path.exists() {
        return Ok(StoreData::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
}

/// Save store data to disk (atomic write)
fn save_to_disk(state: &RwLock<StoreState>) -> Result<(), String> {
    let guard = state
        .read()
        .map_err(|e| format!("Failed to acquire read lock: {}", e))?;

    let path = match &guard.store_path {
        Some(p) => p.clone(),
        None => return Ok(()), // In-memory store
    };

    if !guard.dirty {
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&guard.data)
        .map_err(|e| format!("Failed to serialise config: {}", e))?;

    drop(guard); // Release read lock before file operations

    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, &json).map_err(|e| format!("Failed to write temp file: {}", e))?;

    fs::rename(&temp_path, &path).map_err(|e| format!("Failed to rename temp file: {}", e))?;

    if let Ok(mut guard) = state.write() {
        guard.dirty = false;
        guard.last_save = Instant::now();
    }

    Ok(())
}

/// Spawn the debounced save loop on its own thread so the store works
/// before (and after) the application runtime exists.
fn spawn_saver(state: Arc<RwLock<StoreState>>) -> Option<mpsc::UnboundedSender<()>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();

    let spawned = std::thread::Builder::new()
        .name("config-saver".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tlog!("[ConfigStore] Failed to start save runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let mut pending = false;

                loop {
                    tokio::select! {
                        result = rx.recv() => {
                            if result.is_none() {
                                // Store dropped; write whatever is left
                                if pending {
                                    if let Err(e) = save_to_disk(&state) {
                                        tlog!("[ConfigStore] Failed to save: {}", e);
                                    }
                                }
                                break;
                            }
                            pending = true;
                        }
                        _ = tokio::time::sleep(SAVE_DEBOUNCE), if pending => {
                            pending = false;
                            if let Err(e) = save_to_disk(&state) {
                                tlog!("[ConfigStore] Failed to save: {}", e);
                            }
                        }
                    }
                }
            });
        });

    match spawned {
        Ok(_) => Some(tx),
        Err(e) => {
            tlog!("[ConfigStore] Failed to spawn saver thread: {}", e);
            None
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

impl ConfigStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let data = load_from_disk(path)?;
        tlog!("[ConfigStore] Loaded {} entries from {}", data.entries.len(), path.display());

        let state = Arc::new(RwLock::new(StoreState {
            data,
            store_path: Some(path.to_path_buf()),
            dirty: false,
            last_save: Instant::now(),
        }));
        let save_tx = spawn_saver(state.clone());

        Ok(Self { state, save_tx })
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                data: StoreData::default(),
                store_path: None,
                dirty: false,
                last_save: Instant::now(),
            })),
            save_tx: None,
        }
    }

    fn schedule_save(&self) {
        if let Some(tx) = &self.save_tx {
            let _ = tx.send(());
        }
    }

    /// Delete a value. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, String> {
        let mut guard = self
            .state
            .write()
            .map_err(|e| format!("Failed to acquire write lock: {}", e))?;

        let existed = guard.data.entries.remove(key).is_some();
        if existed {
            guard.dirty = true;
            drop(guard);
            self.schedule_save();
        }
        Ok(existed)
    }

    pub fn has(&self, key: &str) -> bool {
        self.state
            .read()
            .map(|s| s.data.entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn keys(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.data.entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Force an immediate save (before app shutdown)
    pub fn flush(&self) -> Result<(), String> {
        save_to_disk(&self.state)
    }

    /// Time since the last successful write.
    pub fn since_last_save(&self) -> Option<Duration> {
        self.state.read().ok().map(|s| s.last_save.elapsed())
    }
}

impl ConfigAccessor for ConfigStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let guard = self.state.read().ok()?;
        guard.data.entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), String> {
        let mut guard = self
            .state
            .write()
            .map_err(|e| format!("Failed to acquire write lock: {}", e))?;

        guard.data.entries.insert(key.to_string(), value);
        guard.dirty = true;

        drop(guard); // Release lock before scheduling save

        self.schedule_save();
        Ok(())
    }
}
