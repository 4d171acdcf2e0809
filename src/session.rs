//! The signed-in user's working state: the live journal document, the
//! user's preferences, and the save paths for both. The document lives
//! behind an `Arc<Mutex<..>>` because the backup engine reads it from its
//! tick thread; everything else is single-owner.

use crate::codec;
use crate::document::{Entry, EntryKind, FontSpec, JournalDocument};
use crate::persist;
use crate::prefs::Preferences;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const DOCUMENT_FILE: &str = "database.json";
const PREFS_FILE: &str = "config_pref.json";
const EXPORT_DIR: &str = "Export";

pub struct JournalSession {
    users_dir: PathBuf,
    export_dir: PathBuf,
    current_user: String,
    doc_passes: u32,
    document: Arc<Mutex<JournalDocument>>,
    pub prefs: Preferences,
    document_path: Option<PathBuf>,
    prefs_path: Option<PathBuf>,
}

impl JournalSession {
    pub fn new(root: &Path) -> Self {
        Self {
            users_dir: root.join("Data").join("Users"),
            export_dir: root.join(EXPORT_DIR),
            current_user: String::new(),
            doc_passes: 1,
            document: Arc::new(Mutex::new(JournalDocument::new())),
            prefs: Preferences::default(),
            document_path: None,
            prefs_path: None,
        }
    }

    /// Load a user's preferences and journal document after their
    /// credentials have been verified. `passes` is the user's document
    /// pass-count from the credentials record.
    ///
    /// A corrupted document does not block sign-in: the session starts with
    /// an empty journal and the returned message (empty on success) tells
    /// the user what happened.
    pub fn open_user(&mut self, user: &str, passes: u32) -> crate::Result<String> {
        let user_dir = self.users_dir.join(user);
        let prefs_path = user_dir.join(PREFS_FILE);
        let document_path = user_dir.join(DOCUMENT_FILE);

        self.prefs = persist::read_json_or_default(&prefs_path, &Preferences::default())?;

        let empty = codec::encode_value(&JournalDocument::new(), passes)?;
        let raw: String = persist::read_json_or_default(&document_path, &empty)?;
        let (document, message) = match codec::decode_value::<JournalDocument>(&raw, passes) {
            Some(document) => (document, String::new()),
            None => {
                warn!(user, "journal document failed to decode");
                (
                    JournalDocument::new(),
                    "User's data has been corrupted. Starting with an empty journal.".to_string(),
                )
            }
        };

        *self.lock()? = document;
        self.current_user = user.to_string();
        self.doc_passes = passes;
        self.document_path = Some(document_path);
        self.prefs_path = Some(prefs_path);
        info!(user, "journal session opened");
        Ok(message)
    }

    /// Flush preferences and the obfuscated document to disk.
    pub fn save(&self) -> crate::Result<()> {
        let (Some(document_path), Some(prefs_path)) = (&self.document_path, &self.prefs_path)
        else {
            return Err(crate::VaultError::Session("no user is signed in".to_string()));
        };
        persist::write_json(prefs_path, &self.prefs)?;
        let encoded = codec::encode_value(&*self.lock()?, self.doc_passes)?;
        persist::write_json(document_path, &encoded)
    }

    /// Save and drop the signed-in user's state. Callers cancel any running
    /// auto backup before this.
    pub fn log_out(&mut self) -> crate::Result<()> {
        self.save()?;
        info!(user = %self.current_user, "journal session closed");
        self.current_user.clear();
        self.doc_passes = 1;
        self.document_path = None;
        self.prefs_path = None;
        self.prefs = Preferences::default();
        *self.lock()? = JournalDocument::new();
        Ok(())
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    pub fn doc_passes(&self) -> u32 {
        self.doc_passes
    }

    /// Shared handle to the live document, consumed by the backup engine.
    pub fn document(&self) -> Arc<Mutex<JournalDocument>> {
        self.document.clone()
    }

    /// Empty the live document. The on-disk record is untouched until the
    /// next save.
    pub fn clear_data(&mut self) {
        if let Ok(mut doc) = self.document.lock() {
            *doc = JournalDocument::new();
        }
    }

    fn lock(&self) -> crate::Result<std::sync::MutexGuard<'_, JournalDocument>> {
        self.document
            .lock()
            .map_err(|e| crate::VaultError::Session(e.to_string()))
    }

    // Document CRUD, delegated under the lock. Validation failures come back
    // as `false`; the caller owns presenting them.

    pub fn add_category(&self, name: &str) -> bool {
        self.with_doc(|doc| doc.add_category(name))
    }

    pub fn rename_category(&mut self, old: &str, new: &str) -> bool {
        let renamed = self.with_doc(|doc| doc.rename_category(old, new));
        if renamed {
            if let Some(pinned) = self.prefs.pinned.shift_remove(old) {
                self.prefs.pinned.insert(new.trim().to_string(), pinned);
            }
            if self.prefs.last_category == old {
                self.prefs.last_category = new.trim().to_string();
            }
        }
        renamed
    }

    pub fn delete_category(&mut self, name: &str) -> bool {
        let deleted = self.with_doc(|doc| doc.delete_category(name));
        if deleted {
            self.prefs.unpin(name);
        }
        deleted
    }

    pub fn add_definition(&self, category: &str, name: &str) -> bool {
        let font = self.prefs.default_font.clone();
        self.with_doc(|doc| doc.add_definition(category, name, font))
    }

    pub fn rename_definition(&mut self, category: &str, old: &str, new: &str) -> bool {
        let renamed = self.with_doc(|doc| doc.rename_definition(category, old, new));
        if renamed && self.prefs.pinned_for(category) == Some(old) {
            self.prefs.pin(category, new.trim());
        }
        renamed
    }

    pub fn delete_definitions(&mut self, category: &str, names: &[String]) -> bool {
        let deleted = self.with_doc(|doc| doc.delete_definitions(category, names));
        if deleted {
            if let Some(pinned) = self.prefs.pinned_for(category) {
                if names.iter().any(|n| n == pinned) {
                    self.prefs.unpin(category);
                }
            }
        }
        deleted
    }

    pub fn paste_definition(&self, category: &str, name: &str, entry: Entry) -> bool {
        self.with_doc(|doc| doc.paste_definition(category, name, entry))
    }

    pub fn reorder_definitions(&self, category: &str, new_order: &[String]) -> bool {
        self.with_doc(|doc| doc.reorder_definitions(category, new_order))
    }

    pub fn set_text(&self, category: &str, definition: &str, text: &str) -> bool {
        self.with_doc(|doc| doc.set_text(category, definition, text))
    }

    pub fn set_font(&self, category: &str, definition: &str, font: FontSpec) -> bool {
        self.with_doc(|doc| doc.set_font(category, definition, font))
    }

    pub fn set_kind(&self, category: &str, definition: &str, kind: EntryKind) -> bool {
        self.with_doc(|doc| doc.set_kind(category, definition, kind))
    }

    pub fn category_names(&self) -> Vec<String> {
        self.with_doc(|doc| doc.category_names())
    }

    pub fn definition_names(&self, category: &str) -> Vec<String> {
        self.with_doc(|doc| doc.definition_names(category))
    }

    pub fn entry(&self, category: &str, definition: &str) -> Option<Entry> {
        self.with_doc(|doc| doc.entry(category, definition).cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.with_doc(|doc| doc.is_empty())
    }

    fn with_doc<R: Default>(&self, f: impl FnOnce(&mut JournalDocument) -> R) -> R {
        match self.document.lock() {
            Ok(mut doc) => f(&mut doc),
            Err(_) => R::default(),
        }
    }

    // Pinning. The pin lives in the preferences record, not the document;
    // display order puts the pinned definition first.

    pub fn pin_definition(&mut self, category: &str, definition: &str) -> bool {
        if self.entry(category, definition).is_none() {
            return false;
        }
        self.prefs.pin(category, definition);
        true
    }

    pub fn unpin_definition(&mut self, category: &str) -> bool {
        self.prefs.unpin(category)
    }

    /// Definition names in display order: the pinned one first, the rest in
    /// stored order.
    pub fn definitions_for_display(&self, category: &str) -> Vec<String> {
        let names = self.definition_names(category);
        let Some(pinned) = self.prefs.pinned_for(category) else {
            return names;
        };
        if !names.iter().any(|n| n == pinned) {
            return names;
        }
        let mut ordered = Vec::with_capacity(names.len());
        ordered.push(pinned.to_string());
        ordered.extend(names.into_iter().filter(|n| n != pinned));
        ordered
    }

    // Import/export. Exports are plaintext by design: they are the user's
    // way of moving data between installs.

    /// Write the selected categories/definitions as plain JSON under
    /// `Export/<user>/`. Returns the file path.
    pub fn export_selection(
        &self,
        selection: &IndexMap<String, Vec<String>>,
    ) -> crate::Result<PathBuf> {
        let mut export = JournalDocument::new();
        {
            let doc = self.lock()?;
            for (category, definitions) in selection {
                for name in definitions {
                    if let Some(entry) = doc.entry(category, name) {
                        export.add_category(category);
                        export.paste_definition(category, name, entry.clone());
                    }
                }
            }
        }
        let folder = self.export_dir.join(&self.current_user);
        persist::ensure_dir(&folder)?;
        let path = folder.join(format!(
            "database_exported_{}.json",
            self.current_user.to_lowercase()
        ));
        persist::write_json(&path, &export)?;
        info!(user = %self.current_user, path = %path.display(), "journal exported");
        Ok(path)
    }

    /// Merge the selected subset of `source` into the live document.
    /// Existing definitions with the same name are replaced. Callers take a
    /// backup first.
    pub fn import_selection(
        &self,
        selection: &IndexMap<String, Vec<String>>,
        source: &JournalDocument,
    ) -> bool {
        let Ok(mut doc) = self.document.lock() else {
            return false;
        };
        for (category, definitions) in selection {
            for name in definitions {
                let Some(entry) = source.entry(category, name) else {
                    return false;
                };
                doc.add_category(category);
                if doc.entry(category, name).is_some() {
                    doc.delete_definitions(category, std::slice::from_ref(name));
                }
                doc.paste_definition(category, name, entry.clone());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session_with_user(tmp_dir: &TempDir, user: &str, passes: u32) -> JournalSession {
        let mut session = JournalSession::new(tmp_dir.path());
        std::fs::create_dir_all(tmp_dir.path().join("Data").join("Users").join(user)).unwrap();
        let message = session.open_user(user, passes).unwrap();
        assert_eq!(message, "");
        session
    }

    #[test]
    fn test_open_user_bootstraps_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let session = session_with_user(&tmp_dir, "alice", 3);
        assert!(session.is_empty());
        assert_eq!(session.prefs.entry_limit, 20);
        assert_eq!(session.current_user(), "alice");
        assert_eq!(session.doc_passes(), 3);
    }

    #[test]
    fn test_save_and_reopen_roundtrip() {
        let tmp_dir = TempDir::new().unwrap();
        let mut session = session_with_user(&tmp_dir, "alice", 5);
        assert!(session.add_category("Notes"));
        assert!(session.add_definition("Notes", "Today"));
        assert!(session.set_text("Notes", "Today", "hello"));
        session.prefs.last_category = "Notes".to_string();
        session.save().unwrap();

        session.open_user("alice", 5).unwrap();
        assert_eq!(session.entry("Notes", "Today").unwrap().text(), "hello");
        assert_eq!(session.prefs.last_category, "Notes");
    }

    #[test]
    fn test_document_on_disk_is_obfuscated() {
        let tmp_dir = TempDir::new().unwrap();
        let session = session_with_user(&tmp_dir, "alice", 2);
        session.add_category("Secrets");
        session.save().unwrap();

        let raw = std::fs::read_to_string(
            tmp_dir
                .path()
                .join("Data")
                .join("Users")
                .join("alice")
                .join("database.json"),
        )
        .unwrap();
        assert!(!raw.contains("Secrets"));
    }

    #[test]
    fn test_corrupt_document_does_not_block_open() {
        let tmp_dir = TempDir::new().unwrap();
        let user_dir = tmp_dir.path().join("Data").join("Users").join("alice");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(user_dir.join("database.json"), "\"totally not base64\"").unwrap();

        let mut session = JournalSession::new(tmp_dir.path());
        let message = session.open_user("alice", 4).unwrap();
        assert!(message.contains("corrupted"));
        assert!(session.is_empty());
    }

    #[test]
    fn test_rename_updates_pin_and_last_category() {
        let tmp_dir = TempDir::new().unwrap();
        let mut session = session_with_user(&tmp_dir, "alice", 2);
        session.add_category("Notes");
        session.add_definition("Notes", "Today");
        session.add_definition("Notes", "Later");
        assert!(session.pin_definition("Notes", "Later"));
        session.prefs.last_category = "Notes".to_string();

        assert!(session.rename_definition("Notes", "Later", "Soon"));
        assert_eq!(session.prefs.pinned_for("Notes"), Some("Soon"));

        assert!(session.rename_category("Notes", "Journal"));
        assert_eq!(session.prefs.pinned_for("Journal"), Some("Soon"));
        assert_eq!(session.prefs.last_category, "Journal");
    }

    #[test]
    fn test_pinned_definition_displays_first() {
        let tmp_dir = TempDir::new().unwrap();
        let mut session = session_with_user(&tmp_dir, "alice", 2);
        session.add_category("Notes");
        for name in ["a", "b", "c"] {
            session.add_definition("Notes", name);
        }
        assert!(session.pin_definition("Notes", "c"));
        assert_eq!(session.definitions_for_display("Notes"), vec!["c", "a", "b"]);
        // Stored order is unchanged; only display order moves the pin.
        assert_eq!(session.definition_names("Notes"), vec!["a", "b", "c"]);

        assert!(session.unpin_definition("Notes"));
        assert_eq!(session.definitions_for_display("Notes"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deleting_pinned_definition_clears_pin() {
        let tmp_dir = TempDir::new().unwrap();
        let mut session = session_with_user(&tmp_dir, "alice", 2);
        session.add_category("Notes");
        session.add_definition("Notes", "Today");
        session.pin_definition("Notes", "Today");
        assert!(session.delete_definitions("Notes", &["Today".to_string()]));
        assert_eq!(session.prefs.pinned_for("Notes"), None);
    }

    #[test]
    fn test_export_then_import_selection() {
        let tmp_dir = TempDir::new().unwrap();
        let session = session_with_user(&tmp_dir, "alice", 2);
        session.add_category("Notes");
        session.add_definition("Notes", "Today");
        session.set_text("Notes", "Today", "hello");

        let mut selection = IndexMap::new();
        selection.insert("Notes".to_string(), vec!["Today".to_string()]);
        let path = session.export_selection(&selection).unwrap();
        let source: JournalDocument =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(source.entry("Notes", "Today").unwrap().text(), "hello");

        let other = session_with_user(&tmp_dir, "bob", 2);
        assert!(other.import_selection(&selection, &source));
        assert_eq!(other.entry("Notes", "Today").unwrap().text(), "hello");
    }
}
