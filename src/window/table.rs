//! Arena-style window table.
//!
//! Entries live in generation-tagged slots with a name index on top.
//! `remove` is the only way an entry leaves the table, so every eviction path
//! (closed event, crash loop, bulk close, safe close) goes through one place
//! and an entry can only be removed once.

use std::collections::HashMap;

use super::crash::CrashRecord;
use super::{same_window, WindowHandle};

/// Stable reference to a slot. Stale keys (slot reused) resolve to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: usize,
    generation: u32,
}

pub type FirstLoadTask = Box<dyn FnOnce(WindowHandle) + Send>;

pub struct WindowEntry {
    pub name: String,
    pub handle: WindowHandle,
    pub crash: CrashRecord,
    /// Hidden while fullscreen; fullscreen must be cleared before re-show
    pub hidden_while_fullscreen: bool,
    /// Last state reported to content
    pub maximized: bool,
    pub fullscreen: bool,
    /// Content has finished at least one load
    pub loaded: bool,
    /// Content can answer liveness pings (bundled page with the IPC bridge)
    pub answers_pings: bool,
    pub first_load_tasks: Vec<FirstLoadTask>,
}

impl WindowEntry {
    pub fn new(name: &str, handle: WindowHandle) -> Self {
        Self {
            name: name.to_string(),
            handle,
            crash: CrashRecord::default(),
            hidden_while_fullscreen: false,
            maximized: false,
            fullscreen: false,
            loaded: false,
            answers_pings: false,
            first_load_tasks: Vec::new(),
        }
    }
}

struct Slot {
    generation: u32,
    entry: Option<WindowEntry>,
}

#[derive(Default)]
pub struct WindowTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_name: HashMap<String, SlotKey>,
}

impl WindowTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Insert an entry. Fails (returning the entry) when the name is taken or
    /// the handle is already registered under another name.
    pub fn insert(&mut self, entry: WindowEntry) -> Result<SlotKey, WindowEntry> {
        if self.by_name.contains_key(&entry.name) || self.find_by_handle(&entry.handle).is_some() {
            return Err(entry);
        }

        let key = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation = slot.generation.wrapping_add(1);
                slot.entry = Some(entry);
                SlotKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                SlotKey {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };

        if let Some(e) = self.slots[key.index].entry.as_ref() {
            self.by_name.insert(e.name.clone(), key);
        }
        Ok(key)
    }

    pub fn key(&self, name: &str) -> Option<SlotKey> {
        self.by_name.get(name).copied()
    }

    pub fn by_key(&self, key: SlotKey) -> Option<&WindowEntry> {
        self.slots
            .get(key.index)
            .filter(|s| s.generation == key.generation)
            .and_then(|s| s.entry.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&WindowEntry> {
        self.key(name).and_then(|k| self.by_key(k))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut WindowEntry> {
        let key = self.key(name)?;
        self.slots
            .get_mut(key.index)
            .filter(|s| s.generation == key.generation)
            .and_then(|s| s.entry.as_mut())
    }

    /// Identity scan; window counts are small.
    pub fn find_by_handle(&self, handle: &WindowHandle) -> Option<&WindowEntry> {
        self.iter().find(|e| same_window(&e.handle, handle))
    }

    /// Remove an entry. Returns `None` if it was already gone.
    pub fn remove(&mut self, name: &str) -> Option<WindowEntry> {
        let key = self.by_name.remove(name)?;
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        let entry = slot.entry.take();
        if entry.is_some() {
            self.free.push(key.index);
        }
        entry
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &WindowEntry> {
        self.slots.iter().filter_map(|s| s.entry.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|e| e.name.clone()).collect()
    }

    pub fn handles(&self) -> Vec<WindowHandle> {
        self.iter().map(|e| e.handle.clone()).collect()
    }
}
