//! The in-memory journal document: an insertion-ordered mapping from
//! category name to an insertion-ordered mapping from definition name to
//! entry. Insertion order IS the display order, so every mutation here is
//! careful about where keys land.
//!
//! Entries serialize as the 4-tuple `[text, timestamp, [family, size], kind]`.

use chrono::Local;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Font family plus point size, serialized as `["Arial", 12]`.
pub type FontSpec = (String, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Text,
    Todo,
}

/// One journal entry: text, creation date, tab font, and the entry-type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry(pub String, pub String, pub FontSpec, pub EntryKind);

impl Entry {
    pub fn new(text: &str, timestamp: &str, font: FontSpec, kind: EntryKind) -> Self {
        Self(text.to_string(), timestamp.to_string(), font, kind)
    }

    /// A fresh empty entry dated today.
    pub fn blank(font: FontSpec) -> Self {
        Self(String::new(), today(), font, EntryKind::Text)
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn timestamp(&self) -> &str {
        &self.1
    }

    pub fn font(&self) -> &FontSpec {
        &self.2
    }

    pub fn kind(&self) -> EntryKind {
        self.3
    }
}

/// Current date in the `%Y-%m-%d` form entries carry.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

pub type Definitions = IndexMap<String, Entry>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalDocument {
    categories: IndexMap<String, Definitions>,
}

impl JournalDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    pub fn definition_names(&self, category: &str) -> Vec<String> {
        self.categories
            .get(category)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn entry(&self, category: &str, definition: &str) -> Option<&Entry> {
        self.categories.get(category)?.get(definition)
    }

    /// Add a new empty category. Rejects empty, all-whitespace and duplicate
    /// names; the stored name is trimmed.
    pub fn add_category(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.categories.contains_key(name) {
            return false;
        }
        self.categories.insert(name.to_string(), Definitions::new());
        true
    }

    /// Rename a category in place: the renamed key keeps its original
    /// position in the display order.
    pub fn rename_category(&mut self, old: &str, new: &str) -> bool {
        let new = new.trim();
        if new.is_empty() || self.categories.contains_key(new) {
            return false;
        }
        let Some(index) = self.categories.get_index_of(old) else {
            return false;
        };
        let defs = self
            .categories
            .shift_remove(old)
            .expect("key was present at a known index");
        self.categories.shift_insert(index, new.to_string(), defs);
        true
    }

    pub fn delete_category(&mut self, name: &str) -> bool {
        self.categories.shift_remove(name).is_some()
    }

    /// Add a new empty definition under `category`, dated today.
    pub fn add_definition(&mut self, category: &str, name: &str, font: FontSpec) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(defs) = self.categories.get_mut(category) else {
            return false;
        };
        if defs.contains_key(name) {
            return false;
        }
        defs.insert(name.to_string(), Entry::blank(font));
        true
    }

    /// Rename a definition in place, preserving its position within the
    /// category.
    pub fn rename_definition(&mut self, category: &str, old: &str, new: &str) -> bool {
        let new = new.trim();
        if new.is_empty() {
            return false;
        }
        let Some(defs) = self.categories.get_mut(category) else {
            return false;
        };
        if defs.contains_key(new) {
            return false;
        }
        let Some(index) = defs.get_index_of(old) else {
            return false;
        };
        let entry = defs
            .shift_remove(old)
            .expect("key was present at a known index");
        defs.shift_insert(index, new.to_string(), entry);
        true
    }

    /// Remove a batch of definitions. Returns false when the category or any
    /// named definition is missing; definitions named before the missing one
    /// are still removed.
    pub fn delete_definitions(&mut self, category: &str, names: &[String]) -> bool {
        let Some(defs) = self.categories.get_mut(category) else {
            return false;
        };
        for name in names {
            if defs.shift_remove(name).is_none() {
                return false;
            }
        }
        true
    }

    /// Insert a fully-formed entry (clipboard paste, import). The entry-type
    /// tag travels with the entry unchanged. Rejects duplicates.
    pub fn paste_definition(&mut self, category: &str, name: &str, entry: Entry) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(defs) = self.categories.get_mut(category) else {
            return false;
        };
        if defs.contains_key(name) {
            return false;
        }
        defs.insert(name.to_string(), entry);
        true
    }

    /// Rebuild a category's definitions in the given order (drag-reorder).
    /// Every name in `new_order` must already exist in the category.
    pub fn reorder_definitions(&mut self, category: &str, new_order: &[String]) -> bool {
        let Some(defs) = self.categories.get_mut(category) else {
            return false;
        };
        if new_order.len() != defs.len() {
            return false;
        }
        let mut reordered = Definitions::with_capacity(new_order.len());
        for name in new_order {
            let Some(entry) = defs.get(name) else {
                return false;
            };
            reordered.insert(name.clone(), entry.clone());
        }
        *defs = reordered;
        true
    }

    pub fn set_text(&mut self, category: &str, definition: &str, text: &str) -> bool {
        match self.entry_mut(category, definition) {
            Some(entry) => {
                entry.0 = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_font(&mut self, category: &str, definition: &str, font: FontSpec) -> bool {
        match self.entry_mut(category, definition) {
            Some(entry) => {
                entry.2 = font;
                true
            }
            None => false,
        }
    }

    pub fn set_kind(&mut self, category: &str, definition: &str, kind: EntryKind) -> bool {
        match self.entry_mut(category, definition) {
            Some(entry) => {
                entry.3 = kind;
                true
            }
            None => false,
        }
    }

    fn entry_mut(&mut self, category: &str, definition: &str) -> Option<&mut Entry> {
        self.categories.get_mut(category)?.get_mut(definition)
    }
}
