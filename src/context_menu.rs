//! Context menu templates for content surfaces.
//!
//! Content reports what is under the cursor (selection, editability,
//! spelling) and the host answers with a native menu built from these rules.

use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Mutex;

const ID_CUT: &str = "ctx:cut";
const ID_COPY: &str = "ctx:copy";
const ID_PASTE: &str = "ctx:paste";
const ID_INSPECT: &str = "ctx:inspect";
const ID_NO_GUESSES: &str = "ctx:no-guesses";
const PREFIX_SUGGEST: &str = "ctx:suggest:";
const PREFIX_LEARN: &str = "ctx:learn:";
const PREFIX_SEPARATOR: &str = "ctx:sep-";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditFlags {
    pub can_cut: bool,
    pub can_copy: bool,
    pub can_paste: bool,
}

/// What content reports when the user opens a context menu.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextParams {
    pub selection_text: String,
    pub is_editable: bool,
    pub edit_flags: EditFlags,
    pub misspelled_word: String,
    pub dictionary_suggestions: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuRole {
    Cut,
    Copy,
    Paste,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Normal,
    Separator,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MenuEntry {
    pub id: String,
    pub label: String,
    pub kind: EntryKind,
    /// Native edit role. Always `None` on disabled entries.
    pub role: Option<MenuRole>,
    pub enabled: bool,
}

/// What clicking a custom entry does. Role entries are handled natively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuAction {
    ReplaceMisspelling(String),
    LearnSpelling(String),
    ToggleDevTools,
}

impl MenuAction {
    pub fn from_id(id: &str) -> Option<Self> {
        if id == ID_INSPECT {
            return Some(MenuAction::ToggleDevTools);
        }
        if let Some(word) = id.strip_prefix(PREFIX_SUGGEST) {
            return Some(MenuAction::ReplaceMisspelling(word.to_string()));
        }
        id.strip_prefix(PREFIX_LEARN)
            .map(|word| MenuAction::LearnSpelling(word.to_string()))
    }
}

struct Candidate {
    entry: MenuEntry,
    visible: bool,
}

fn item(id: String, label: &str, role: Option<MenuRole>, enabled: bool, visible: bool) -> Candidate {
    Candidate {
        entry: MenuEntry {
            id,
            label: label.to_string(),
            kind: EntryKind::Normal,
            role,
            enabled,
        },
        visible,
    }
}

fn separator(n: usize) -> Candidate {
    Candidate {
        entry: MenuEntry {
            id: format!("{}{}", PREFIX_SEPARATOR, n),
            label: String::new(),
            kind: EntryKind::Separator,
            role: None,
            enabled: true,
        },
        visible: true,
    }
}

/// Build the menu for `params`. `None` means show nothing.
///
/// The desktop webviews do not report spellcheck results to page script, so
/// the spelling entries only appear when content supplies a misspelled word
/// itself.
pub fn build_menu(params: &ContextParams) -> Option<Vec<MenuEntry>> {
    let has_selection = !params.selection_text.trim().is_empty();
    let editable = params.is_editable;
    let mut candidates = Vec::new();

    let misspelled = params.misspelled_word.trim();
    if !misspelled.is_empty() {
        if params.dictionary_suggestions.is_empty() {
            candidates.push(item(
                ID_NO_GUESSES.to_string(),
                "No Guesses Found",
                None,
                false,
                true,
            ));
        } else {
            for suggestion in &params.dictionary_suggestions {
                candidates.push(item(
                    format!("{}{}", PREFIX_SUGGEST, suggestion),
                    suggestion,
                    None,
                    true,
                    true,
                ));
            }
        }
        candidates.push(item(
            format!("{}{}", PREFIX_LEARN, misspelled),
            "Learn Spelling",
            None,
            true,
            true,
        ));
        candidates.push(separator(0));
    }

    candidates.push(item(
        ID_CUT.to_string(),
        "Cut",
        Some(MenuRole::Cut),
        has_selection && editable && params.edit_flags.can_cut,
        editable,
    ));
    candidates.push(item(
        ID_COPY.to_string(),
        "Copy",
        Some(MenuRole::Copy),
        has_selection && params.edit_flags.can_copy,
        editable || has_selection,
    ));
    candidates.push(item(
        ID_PASTE.to_string(),
        "Paste",
        Some(MenuRole::Paste),
        editable,
        editable,
    ));
    candidates.push(separator(1));
    candidates.push(item(
        ID_INSPECT.to_string(),
        "Inspect Element",
        None,
        true,
        true,
    ));

    visible_entries(candidates)
}

/// Drop hidden candidates and stray separators; `None` if nothing is left.
fn visible_entries(candidates: Vec<Candidate>) -> Option<Vec<MenuEntry>> {
    let mut entries: Vec<MenuEntry> = Vec::new();
    for Candidate { mut entry, visible } in candidates {
        if !visible {
            continue;
        }
        if !entry.enabled {
            entry.role = None;
        }
        // Collapse separators that would sit at the top or next to each other
        if entry.kind == EntryKind::Separator
            && entries.last().map_or(true, |e| e.kind == EntryKind::Separator)
        {
            continue;
        }
        entries.push(entry);
    }
    while entries.last().map_or(false, |e| e.kind == EntryKind::Separator) {
        entries.pop();
    }

    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Tracks which content surfaces have a context menu attached.
#[derive(Default)]
pub struct ContextMenuProvider {
    attached: Mutex<HashSet<String>>,
}

impl ContextMenuProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, surface: &str) {
        if let Ok(mut attached) = self.attached.lock() {
            attached.insert(surface.to_string());
        }
    }

    pub fn detach(&self, surface: &str) {
        if let Ok(mut attached) = self.attached.lock() {
            attached.remove(surface);
        }
    }

    pub fn is_attached(&self, surface: &str) -> bool {
        self.attached
            .lock()
            .map(|a| a.contains(surface))
            .unwrap_or(false)
    }

    /// Menu for `surface`, or `None` when the surface has no menu attached or
    /// nothing would be visible.
    pub fn menu_for(
        &self,
        surface: &str,
        params: &ContextParams,
    ) -> Option<Vec<MenuEntry>> {
        if !self.is_attached(surface) {
            return None;
        }
        build_menu(params)
    }
}
