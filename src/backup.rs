//! Backup snapshots and restore.
//!
//! Manual backups are stateless one-shots, each writing a fresh snapshot
//! file that is never touched again. Auto backup is a session-scoped
//! schedule overwriting a single file each tick. The schedule cancels
//! itself when the document empties, and restore cancels it before
//! replacing the document so a tick never reads a half-swapped journal.

use crate::alerts::{AlertLevel, AlertSystem};
use crate::codec;
use crate::document::JournalDocument;
use crate::persist;
use crate::scheduler::{spawn_repeating, TickHandle};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

const BACKUPS_DIR: &str = "Back Ups";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Called synchronously at the top of every auto-backup tick so in-progress
/// edits land in the document before it is read.
pub type FlushEdits = Arc<dyn Fn() + Send + Sync>;
/// Called after restore replaces the live document; whatever holds views of
/// the old document must rebuild.
pub type DocumentReplaced = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, PartialEq, Eq)]
pub enum BackupOutcome {
    Written(PathBuf),
    /// The document was empty; nothing was written.
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Stopped,
    /// There was no schedule to stop. Safe to hit from logout/quit paths.
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    /// The snapshot failed to decode; the live document is untouched.
    Corrupt,
}

struct AutoBackup {
    handle: TickHandle,
    running: Arc<AtomicBool>,
}

pub struct BackupEngine {
    backups_dir: PathBuf,
    alerts: Arc<AlertSystem>,
    flush_edits: Arc<Mutex<Option<FlushEdits>>>,
    document_replaced: Mutex<Option<DocumentReplaced>>,
    auto: Option<AutoBackup>,
    /// The session's auto snapshot file, fixed on the first start and
    /// reused across cancel/restart so one session keeps one auto file.
    auto_path: Option<(String, PathBuf)>,
}

impl BackupEngine {
    pub fn new(root: &Path, alerts: Arc<AlertSystem>) -> Self {
        Self {
            backups_dir: root.join(BACKUPS_DIR),
            alerts,
            flush_edits: Arc::new(Mutex::new(None)),
            document_replaced: Mutex::new(None),
            auto: None,
            auto_path: None,
        }
    }

    pub fn set_flush_edits(&self, callback: FlushEdits) {
        if let Ok(mut slot) = self.flush_edits.lock() {
            *slot = Some(callback);
        }
    }

    pub fn set_document_replaced(&self, callback: DocumentReplaced) {
        if let Ok(mut slot) = self.document_replaced.lock() {
            *slot = Some(callback);
        }
    }

    fn user_dir(&self, user: &str) -> PathBuf {
        self.backups_dir.join(user)
    }

    fn snapshot_path(&self, user: &str, label: &str) -> PathBuf {
        let stamp = Local::now().format(TIMESTAMP_FORMAT);
        self.user_dir(user)
            .join(format!("{}-{}-{}.json", stamp, label, user))
    }

    /// Path for a new manual snapshot. A save landing on an already-taken
    /// timestamp gets a disambiguating suffix, so an existing snapshot is
    /// never overwritten. The suffix sorts after the bare name, keeping
    /// most-recent-first ordering.
    fn fresh_snapshot_path(&self, user: &str, label: &str) -> PathBuf {
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let dir = self.user_dir(user);
        let mut path = dir.join(format!("{}-{}-{}.json", stamp, label, user));
        let mut attempt = 1u32;
        while path.exists() {
            path = dir.join(format!("{}_{}-{}-{}.json", stamp, attempt, label, user));
            attempt += 1;
        }
        path
    }

    fn write_snapshot(
        path: &Path,
        document: &JournalDocument,
        passes: u32,
    ) -> crate::Result<()> {
        let encoded = codec::encode_value(document, passes)?;
        persist::write_json(path, &encoded)
    }

    /// One-shot manual backup to a fresh timestamped snapshot. An empty
    /// document is a reported no-op, never an empty file.
    pub fn backup_now(
        &self,
        user: &str,
        document: &JournalDocument,
        passes: u32,
    ) -> crate::Result<BackupOutcome> {
        if document.is_empty() {
            self.alerts.show("No data to backup.", AlertLevel::Warning);
            return Ok(BackupOutcome::NoData);
        }
        let path = self.fresh_snapshot_path(user, "manual");
        Self::write_snapshot(&path, document, passes)?;
        info!(user, path = %path.display(), "manual backup written");
        self.alerts.show("Backup complete.", AlertLevel::Info);
        Ok(BackupOutcome::Written(path))
    }

    /// Map a user-facing interval choice (seconds) to a tick interval.
    pub fn interval_for_choice(choice: &str) -> Option<Duration> {
        match choice {
            "30" => Some(Duration::from_secs(30)),
            "60" => Some(Duration::from_secs(60)),
            "120" => Some(Duration::from_secs(120)),
            _ => None,
        }
    }

    pub fn is_auto_running(&self) -> bool {
        self.auto
            .as_ref()
            .map(|auto| auto.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Begin the auto-backup schedule. The first tick fires immediately;
    /// every tick flushes pending edits, re-reads the document, and
    /// overwrites one session-scoped snapshot file. A tick that finds the
    /// document empty cancels the schedule.
    pub fn start_auto_backup(
        &mut self,
        user: &str,
        interval: Duration,
        passes: u32,
        document: Arc<Mutex<JournalDocument>>,
    ) -> crate::Result<StartOutcome> {
        if self.is_auto_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        // A self-cancelled schedule may still hold its dead handle.
        self.auto = None;

        let empty = document
            .lock()
            .map(|doc| doc.is_empty())
            .unwrap_or(true);
        if empty {
            self.alerts.show(
                "Auto backup could not be set with no data.",
                AlertLevel::Warning,
            );
            return Ok(StartOutcome::NoData);
        }

        // One file per session; ticks (and restarts) overwrite it.
        let path = match &self.auto_path {
            Some((owner, path)) if owner == user => path.clone(),
            _ => {
                let path = self.snapshot_path(user, "auto");
                self.auto_path = Some((user.to_string(), path.clone()));
                path
            }
        };
        persist::ensure_dir(&self.user_dir(user))?;

        let running = Arc::new(AtomicBool::new(true));
        let running_in_tick = running.clone();
        let alerts = self.alerts.clone();
        let flush_slot = self.flush_edits.clone();
        let user_owned = user.to_string();

        let handle = spawn_repeating(interval, move || {
            if !running_in_tick.load(Ordering::SeqCst) {
                return false;
            }
            // Edits are committed into the document before it is read, so
            // the snapshot reflects unsaved keystrokes. The slot is read
            // each tick; a callback registered after the schedule started
            // still takes effect.
            let flush = flush_slot.lock().ok().and_then(|slot| slot.clone());
            if let Some(flush) = flush {
                flush();
            }
            let snapshot = match document.lock() {
                Ok(doc) => doc.clone(),
                Err(_) => return false,
            };
            if snapshot.is_empty() {
                running_in_tick.store(false, Ordering::SeqCst);
                alerts.show("Auto backup has stopped.", AlertLevel::Warning);
                return false;
            }
            if let Err(e) = Self::write_snapshot(&path, &snapshot, passes) {
                warn!(user = %user_owned, error = %e, "auto backup tick failed");
            }
            true
        });

        self.auto = Some(AutoBackup { handle, running });
        info!(user, ?interval, "auto backup started");
        self.alerts.show("Auto backup has started.", AlertLevel::Info);
        Ok(StartOutcome::Started)
    }

    /// Stop the auto-backup schedule. Distinguishes "I stopped it" from
    /// "nothing to stop" so logout/quit can call this unconditionally.
    pub fn cancel_auto_backup(&mut self) -> CancelOutcome {
        let Some(auto) = self.auto.take() else {
            self.alerts
                .show("Auto backup has not been started.", AlertLevel::Warning);
            return CancelOutcome::NotRunning;
        };
        let was_running = auto.running.swap(false, Ordering::SeqCst);
        auto.handle.cancel();
        if was_running {
            info!("auto backup stopped");
            self.alerts.show("Auto backup has stopped.", AlertLevel::Info);
            CancelOutcome::Stopped
        } else {
            self.alerts
                .show("Auto backup has not been started.", AlertLevel::Warning);
            CancelOutcome::NotRunning
        }
    }

    /// Snapshot file names for `user`, most recent first. The timestamp
    /// prefix makes lexicographic order chronological.
    pub fn snapshots(&self, user: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.user_dir(user))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names.reverse();
        names
    }

    /// Replace the live document with a decoded snapshot, wholesale.
    ///
    /// A snapshot that fails to decode aborts the restore and leaves the
    /// document untouched. On success any running auto backup is cancelled
    /// before the swap, so no tick reads the document mid-replacement.
    pub fn restore(
        &mut self,
        user: &str,
        snapshot: &str,
        passes: u32,
        document: &Arc<Mutex<JournalDocument>>,
    ) -> crate::Result<RestoreOutcome> {
        let path = self.user_dir(user).join(snapshot);
        let raw = std::fs::read_to_string(&path)?;
        let decoded = serde_json::from_str::<String>(&raw)
            .ok()
            .and_then(|encoded| codec::decode_value::<JournalDocument>(&encoded, passes));
        let Some(restored) = decoded else {
            warn!(user, snapshot, "snapshot failed to decode");
            self.alerts
                .show("Backup data has been corrupted.", AlertLevel::Warning);
            return Ok(RestoreOutcome::Corrupt);
        };

        if self.is_auto_running() {
            self.cancel_auto_backup();
        }
        {
            let mut doc = document
                .lock()
                .map_err(|e| crate::VaultError::Backup(e.to_string()))?;
            *doc = restored;
        }
        if let Ok(slot) = self.document_replaced.lock() {
            if let Some(callback) = slot.as_ref() {
                callback();
            }
        }
        info!(user, snapshot, "restored from snapshot");
        self.alerts.show("Restored user's data.", AlertLevel::Info);
        Ok(RestoreOutcome::Restored)
    }
}

impl Drop for BackupEngine {
    fn drop(&mut self) {
        if let Some(auto) = self.auto.take() {
            auto.running.store(false, Ordering::SeqCst);
            auto.handle.cancel();
        }
    }
}
