//! JSON persistence helpers shared by every record type.
//!
//! All writes are full-file overwrites done atomically (temp file + rename),
//! so a record on disk is either the previous version or the new one, never
//! a partial write. First-run bootstrapping goes through
//! [`read_json_or_default`], which writes the default in place of a missing
//! or never-really-written file so callers never see a parse error for the
//! "file doesn't exist yet" case.

use rand::{thread_rng, Rng};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Create `path` and all parents if absent. Idempotent.
pub fn ensure_dir(path: &Path) -> crate::Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| crate::VaultError::FileSystem(format!("{}: {}", path.display(), e)))
}

/// Read a JSON file, bootstrapping it with `default` when it is missing or
/// effectively empty (two bytes or fewer, the leftover of an interrupted
/// first write).
pub fn read_json_or_default<T>(path: &Path, default: &T) -> crate::Result<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let bootstrap = match fs::metadata(path) {
        Ok(meta) => meta.len() <= 2,
        Err(_) => true,
    };
    if bootstrap {
        write_json(path, default)?;
        return Ok(default.clone());
    }
    let data = fs::read_to_string(path)
        .map_err(|e| crate::VaultError::FileSystem(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&data)?)
}

/// Overwrite `path` with pretty-printed JSON, creating the parent directory
/// on demand. The rename also truncates any leftover bytes from a previous
/// longer write.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    atomic_write(path, json.as_bytes())
}

// Write to a temp file in the same directory and rename into place. Rename
// is atomic on the same filesystem on the platforms we care about.
fn atomic_write(path: &Path, bytes: &[u8]) -> crate::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| crate::VaultError::FileSystem("invalid path".to_string()))?;
    let suffix: u64 = thread_rng().gen();
    let tmp: PathBuf = parent.join(format!(".tmp_vault.{}.tmp", suffix));

    fs::write(&tmp, bytes)
        .map_err(|e| crate::VaultError::FileSystem(format!("{}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path)
        .map_err(|e| crate::VaultError::FileSystem(format!("{}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_idempotent() {
        let tmp_dir = TempDir::new().unwrap();
        let nested = tmp_dir.path().join("a").join("b").join("c");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("config.json");
        let default = json!({"current": "", "signed_in": 0});

        let first: serde_json::Value = read_json_or_default(&path, &default).unwrap();
        assert_eq!(first, default);
        assert!(path.exists());

        let second: serde_json::Value = read_json_or_default(&path, &default).unwrap();
        assert_eq!(second, default);
    }

    #[test]
    fn test_near_empty_file_is_rewritten() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("database.json");
        std::fs::write(&path, "{}").unwrap();

        let default = json!({"users": []});
        let value: serde_json::Value = read_json_or_default(&path, &default).unwrap();
        assert_eq!(value, default);
    }

    #[test]
    fn test_existing_content_wins_over_default() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("prefs.json");
        write_json(&path, &json!({"entry_limit": 42})).unwrap();

        let value: serde_json::Value =
            read_json_or_default(&path, &json!({"entry_limit": 20})).unwrap();
        assert_eq!(value["entry_limit"], 42);
    }

    #[test]
    fn test_overwrite_truncates_longer_previous_write() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("record.json");
        write_json(&path, &json!({"a": "a very long value that pads the file out"})).unwrap();
        write_json(&path, &json!({"a": 1})).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }
}
