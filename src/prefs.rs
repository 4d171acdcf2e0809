//! Per-user preferences. Stored as plaintext JSON next to the user's
//! obfuscated records; nothing in here is secret.

use crate::document::FontSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENTRY_LIMIT: u32 = 20;
pub const DEFAULT_TODO_LIMIT: u32 = 10;
pub const DEFAULT_TAB_LIMIT: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Maximum length of category/definition names.
    pub entry_limit: u32,
    /// Maximum items on a todo entry.
    pub todo_limit: u32,
    /// Maximum simultaneously open edit tabs.
    pub tab_limit: u32,
    /// Category selected when the user last logged out.
    pub last_category: String,
    pub default_font: FontSpec,
    /// Pinned definition per category, shown first in listings.
    #[serde(default)]
    pub pinned: IndexMap<String, String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            entry_limit: DEFAULT_ENTRY_LIMIT,
            todo_limit: DEFAULT_TODO_LIMIT,
            tab_limit: DEFAULT_TAB_LIMIT,
            last_category: String::new(),
            default_font: ("Arial".to_string(), 12),
            pinned: IndexMap::new(),
        }
    }
}

impl Preferences {
    pub fn pin(&mut self, category: &str, definition: &str) {
        self.pinned
            .insert(category.to_string(), definition.to_string());
    }

    pub fn unpin(&mut self, category: &str) -> bool {
        self.pinned.shift_remove(category).is_some()
    }

    pub fn pinned_for(&self, category: &str) -> Option<&str> {
        self.pinned.get(category).map(String::as_str)
    }
}
