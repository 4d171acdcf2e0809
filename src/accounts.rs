//! Per-user account directories, obfuscated credentials, and the
//! process-wide session config ("who signed in last, did they want to stay
//! signed in").
//!
//! The credentials record is the bootstrap for everything else about a
//! user: it is decoded with a fixed pass-count and carries, under the
//! reserved `"Data"` key, the randomized pass-count protecting that user's
//! journal document. Passwords are stored and compared in obfuscated form
//! only.

use crate::codec;
use crate::persist;
use crate::prefs::Preferences;
use crate::session::JournalSession;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fixed pass-count for the credentials record itself and for stored
/// passwords.
pub const CREDENTIAL_PASSES: u32 = 4;
/// Fixed pass-count for the session config record.
const CONFIG_PASSES: u32 = 2;
/// Randomized per-user document pass-count range.
const DOC_PASS_RANGE: std::ops::RangeInclusive<u32> = 2..=20;

/// Shown in the user picker when no accounts exist; never a valid username.
pub const SIGNUP_PLACEHOLDER: &str = "SignUp";
/// Reserved credentials-record key holding the document pass-count.
const PASS_KEY: &str = "Data";

const CONFIG_FILE: &str = "config.json";
const CREDENTIALS_FILE: &str = "unknown.json";
const PREFS_FILE: &str = "config_pref.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Last successfully signed-in username, empty when none.
    pub current: String,
    /// 1 when "stay signed in" was ticked, else 0.
    pub signed_in: u8,
}

pub struct LoginManager {
    users_dir: PathBuf,
    config_path: PathBuf,
    pub last_signed_in: String,
    pub stay_signed_in: u8,
}

impl LoginManager {
    pub fn new(root: &Path) -> crate::Result<Self> {
        let config_dir = root.join("Data").join("Config");
        let users_dir = root.join("Data").join("Users");
        persist::ensure_dir(&config_dir)?;
        persist::ensure_dir(&users_dir)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let default = codec::encode_value(&SessionConfig::default(), CONFIG_PASSES)?;
        let raw: String = persist::read_json_or_default(&config_path, &default)?;
        // A corrupt config record is treated as absent.
        let config: SessionConfig = codec::decode_value(&raw, CONFIG_PASSES).unwrap_or_default();

        Ok(Self {
            users_dir,
            config_path,
            last_signed_in: config.current,
            stay_signed_in: config.signed_in,
        })
    }

    /// Usernames with an account directory, or the sign-up placeholder when
    /// none exist yet.
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = std::fs::read_dir(&self.users_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_dir())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        users.sort();
        if users.is_empty() {
            users.push(SIGNUP_PLACEHOLDER.to_string());
        }
        users
    }

    fn user_dir(&self, user: &str) -> PathBuf {
        self.users_dir.join(user)
    }

    fn credentials_path(&self, user: &str) -> PathBuf {
        self.user_dir(user).join(CREDENTIALS_FILE)
    }

    /// Create a new account: credentials record plus default preferences.
    /// Returns `false` (with nothing written) for empty or reserved names
    /// and for names that already have a directory (exact, case-sensitive
    /// match).
    pub fn create_user(&self, user: &str, password: &str) -> crate::Result<bool> {
        let user = user.trim();
        if user.is_empty() || user == SIGNUP_PLACEHOLDER || user == PASS_KEY {
            return Ok(false);
        }
        if self.user_dir(user).is_dir() {
            return Ok(false);
        }

        let doc_passes: u32 = thread_rng().gen_range(DOC_PASS_RANGE);
        let record = json!({
            user: codec::encode_str(password, CREDENTIAL_PASSES),
            PASS_KEY: doc_passes,
        });
        let encoded = codec::encode_value(&record, CREDENTIAL_PASSES)?;

        persist::ensure_dir(&self.user_dir(user))?;
        persist::write_json(&self.credentials_path(user), &encoded)?;
        persist::write_json(&self.user_dir(user).join(PREFS_FILE), &Preferences::default())?;
        info!(user, "account created");
        Ok(true)
    }

    /// The stored (obfuscated) password and document pass-count for `user`,
    /// or `None` when the account or record is missing or corrupted.
    fn credentials(&self, user: &str) -> Option<(String, u32)> {
        let raw = std::fs::read_to_string(self.credentials_path(user)).ok()?;
        let encoded: String = serde_json::from_str(&raw).ok()?;
        let record: Map<String, Value> = codec::decode_value(&encoded, CREDENTIAL_PASSES)?;
        let stored = record.get(user)?.as_str()?.to_string();
        let doc_passes = record.get(PASS_KEY)?.as_u64()? as u32;
        Some((stored, doc_passes))
    }

    /// Verify credentials and open the user's journal session.
    ///
    /// Returns `(signed_in, corruption_message)`. A corrupted journal
    /// document does not block sign-in; the message is non-empty in that
    /// case and the session starts empty. Fails closed on the sign-up
    /// placeholder, unknown users, and unreadable credentials.
    pub fn validate_login(
        &mut self,
        user: &str,
        password: &str,
        stay_signed_in: bool,
        session: &mut JournalSession,
    ) -> crate::Result<(bool, String)> {
        if user.is_empty() || user == SIGNUP_PLACEHOLDER {
            return Ok((false, String::new()));
        }
        let Some((stored, doc_passes)) = self.credentials(user) else {
            warn!(user, "login failed: no readable credentials");
            return Ok((false, String::new()));
        };
        if codec::encode_str(password, CREDENTIAL_PASSES) != stored {
            return Ok((false, String::new()));
        }
        let message = session.open_user(user, doc_passes)?;
        self.remember_sign_in(user, stay_signed_in)?;
        Ok((true, message))
    }

    /// Re-enter a session without a password prompt. Only meaningful when
    /// "stay signed in" was set on a previous login; the caller checks that
    /// flag.
    pub fn bypass(
        &mut self,
        user: &str,
        stay_signed_in: bool,
        session: &mut JournalSession,
    ) -> crate::Result<(bool, String)> {
        if user.is_empty() || user == SIGNUP_PLACEHOLDER {
            return Ok((false, String::new()));
        }
        let Some((_, doc_passes)) = self.credentials(user) else {
            return Ok((false, String::new()));
        };
        let message = session.open_user(user, doc_passes)?;
        self.remember_sign_in(user, stay_signed_in)?;
        info!(user, "signed in via bypass");
        Ok((true, message))
    }

    fn remember_sign_in(&mut self, user: &str, stay_signed_in: bool) -> crate::Result<()> {
        self.last_signed_in = user.to_string();
        self.stay_signed_in = stay_signed_in as u8;
        self.save_config(&SessionConfig {
            current: self.last_signed_in.clone(),
            signed_in: self.stay_signed_in,
        })?;
        info!(user, stay_signed_in, "signed in");
        Ok(())
    }

    /// Change the password and optionally the username. Requires the
    /// current password; refuses a new name that belongs to a different
    /// existing account. Renames the account directory when the name
    /// changed and resets the session config.
    pub fn reset_password(
        &mut self,
        user: &str,
        old_password: &str,
        new_user: &str,
        new_password: &str,
    ) -> crate::Result<bool> {
        if user.is_empty() || user == SIGNUP_PLACEHOLDER {
            return Ok(false);
        }
        // Blank new name keeps the old one.
        let new_user = {
            let trimmed = new_user.trim();
            if trimmed.is_empty() { user } else { trimmed }
        };
        if new_user == SIGNUP_PLACEHOLDER || new_user == PASS_KEY {
            return Ok(false);
        }
        if new_user != user && self.user_dir(new_user).is_dir() {
            return Ok(false);
        }
        let Some((stored, doc_passes)) = self.credentials(user) else {
            return Ok(false);
        };
        if codec::encode_str(old_password, CREDENTIAL_PASSES) != stored {
            return Ok(false);
        }

        let record = json!({
            new_user: codec::encode_str(new_password, CREDENTIAL_PASSES),
            PASS_KEY: doc_passes,
        });
        let encoded = codec::encode_value(&record, CREDENTIAL_PASSES)?;
        persist::write_json(&self.credentials_path(user), &encoded)?;
        if new_user != user {
            std::fs::rename(self.user_dir(user), self.user_dir(new_user)).map_err(|e| {
                crate::VaultError::Account(format!("renaming user directory: {}", e))
            })?;
        }
        self.forget_sign_in()?;
        info!(user, new_user, "credentials changed");
        Ok(true)
    }

    /// Remove an account and everything under its directory. Requires the
    /// correct password.
    pub fn delete_user(&mut self, user: &str, password: &str) -> crate::Result<bool> {
        if user.is_empty() {
            return Ok(false);
        }
        let Some((stored, _)) = self.credentials(user) else {
            return Ok(false);
        };
        if codec::encode_str(password, CREDENTIAL_PASSES) != stored {
            return Ok(false);
        }
        std::fs::remove_dir_all(self.user_dir(user))
            .map_err(|e| crate::VaultError::Account(format!("deleting user directory: {}", e)))?;
        self.forget_sign_in()?;
        info!(user, "account deleted");
        Ok(true)
    }

    fn forget_sign_in(&mut self) -> crate::Result<()> {
        self.last_signed_in.clear();
        self.stay_signed_in = 0;
        self.save_config(&SessionConfig::default())
    }

    fn save_config(&self, config: &SessionConfig) -> crate::Result<()> {
        let encoded = codec::encode_value(config, CONFIG_PASSES)?;
        persist::write_json(&self.config_path, &encoded)
    }
}
