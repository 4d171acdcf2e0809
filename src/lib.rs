//! Storage core for a per-user journal: obfuscated on-disk records,
//! credential-gated sessions, and a backup/restore engine with a cancellable
//! auto-backup schedule.
//!
//! The obfuscation layer is repeated URL-safe base64, not encryption; it
//! keeps records from being casually readable, nothing more. Every record
//! read tolerates corruption by reporting it as a value instead of failing
//! the whole operation.

pub mod accounts;
pub mod alerts;
pub mod backup;
pub mod codec;
pub mod document;
pub mod error;
pub mod persist;
pub mod prefs;
pub mod scheduler;
pub mod session;

pub use accounts::{LoginManager, SessionConfig};
pub use alerts::{Alert, AlertLevel, AlertSystem};
pub use backup::{BackupEngine, BackupOutcome, CancelOutcome, RestoreOutcome, StartOutcome};
pub use document::{Entry, EntryKind, FontSpec, JournalDocument};
pub use error::VaultError;
pub use prefs::Preferences;
pub use session::JournalSession;

pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct Vault {
        manager: LoginManager,
        session: JournalSession,
        engine: BackupEngine,
    }

    fn vault(tmp_dir: &TempDir) -> Vault {
        Vault {
            manager: LoginManager::new(tmp_dir.path()).unwrap(),
            session: JournalSession::new(tmp_dir.path()),
            engine: BackupEngine::new(tmp_dir.path(), AlertSystem::new()),
        }
    }

    #[test]
    fn test_backup_and_restore_end_to_end() {
        let tmp_dir = TempDir::new().unwrap();
        let mut vault = vault(&tmp_dir);

        assert!(vault.manager.create_user("alice", "pw1").unwrap());
        let (ok, message) = vault
            .manager
            .validate_login("alice", "pw1", false, &mut vault.session)
            .unwrap();
        assert!(ok);
        assert_eq!(message, "");

        assert!(vault.session.add_category("Notes"));
        assert!(vault.session.add_definition("Notes", "Today"));
        assert!(vault.session.set_text("Notes", "Today", "hello"));

        let passes = vault.session.doc_passes();
        let snapshot = {
            let document = vault.session.document();
            let doc = document.lock().unwrap().clone();
            let BackupOutcome::Written(path) =
                vault.engine.backup_now("alice", &doc, passes).unwrap()
            else {
                panic!("expected a written snapshot");
            };
            path.file_name().unwrap().to_string_lossy().into_owned()
        };

        vault.session.clear_data();
        assert!(vault.session.is_empty());

        let outcome = vault
            .engine
            .restore("alice", &snapshot, passes, &vault.session.document())
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored);
        assert_eq!(vault.session.category_names(), vec!["Notes"]);
        assert_eq!(vault.session.entry("Notes", "Today").unwrap().text(), "hello");
    }

    #[test]
    fn test_logout_cancels_auto_backup_then_saves() {
        let tmp_dir = TempDir::new().unwrap();
        let mut vault = vault(&tmp_dir);

        vault.manager.create_user("alice", "pw1").unwrap();
        let (ok, _) = vault
            .manager
            .validate_login("alice", "pw1", true, &mut vault.session)
            .unwrap();
        assert!(ok);
        vault.session.add_category("Notes");

        let outcome = vault
            .engine
            .start_auto_backup(
                "alice",
                std::time::Duration::from_secs(60),
                vault.session.doc_passes(),
                vault.session.document(),
            )
            .unwrap();
        assert_eq!(outcome, StartOutcome::Started);

        assert_eq!(vault.engine.cancel_auto_backup(), CancelOutcome::Stopped);
        vault.session.log_out().unwrap();
        assert_eq!(vault.session.current_user(), "");

        // The saved document survives the next login.
        let (ok, _) = vault
            .manager
            .bypass("alice", true, &mut vault.session)
            .unwrap();
        assert!(ok);
        assert_eq!(vault.session.category_names(), vec!["Notes"]);
    }

    #[test]
    fn test_restore_refreshes_via_notification() {
        let tmp_dir = TempDir::new().unwrap();
        let mut vault = vault(&tmp_dir);

        vault.manager.create_user("alice", "pw1").unwrap();
        vault
            .manager
            .validate_login("alice", "pw1", false, &mut vault.session)
            .unwrap();
        vault.session.add_category("Before");
        let passes = vault.session.doc_passes();
        let doc = vault.session.document().lock().unwrap().clone();
        let BackupOutcome::Written(path) = vault.engine.backup_now("alice", &doc, passes).unwrap()
        else {
            panic!("expected a written snapshot");
        };
        let snapshot = path.file_name().unwrap().to_string_lossy().into_owned();

        let refreshed = Arc::new(Mutex::new(Vec::new()));
        let sink = refreshed.clone();
        vault.engine.set_document_replaced(Arc::new(move || {
            sink.lock().unwrap().push("refresh");
        }));

        vault
            .engine
            .restore("alice", &snapshot, passes, &vault.session.document())
            .unwrap();
        assert_eq!(*refreshed.lock().unwrap(), vec!["refresh"]);
    }
}
