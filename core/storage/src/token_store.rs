//! Persistence of the authorization credential.
//!
//! One credential file at a fixed user-scoped path. Absence is not an
//! error, and a corrupt file is treated exactly like an absent one so the
//! caller re-authorizes instead of crashing.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use updrift_common::{Error, Result};

use crate::drive::auth::Credential;

/// Store for the persisted [`Credential`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Default credential location: `~/.updrift/token.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".updrift").join("token.json"))
    }

    /// Open the store at the default user-scoped path.
    pub fn open_default() -> Result<Self> {
        Self::default_path()
            .map(Self::at)
            .ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))
    }

    /// Open a store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential.
    ///
    /// Fails soft: a missing file, unreadable file, or undeserializable
    /// contents all return `None`.
    pub fn load(&self) -> Option<Credential> {
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(credential) => Some(credential),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    "Stored credential is corrupt, treating as absent: {}",
                    err
                );
                None
            }
        }
    }

    /// Persist a credential, overwriting any previous one.
    ///
    /// Writes to a temporary file in the same directory and renames it
    /// into place so a crash never leaves a half-written token behind.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
            restrict_permissions(parent, 0o700)?;
        }

        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| Error::Serialization(format!("Failed to serialize credential: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        restrict_permissions(&tmp, 0o600)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    /// Delete the stored credential. Idempotent.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn credential() -> Credential {
        Credential {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
            refresh: None,
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("token.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("token.json"));

        store.save(&credential()).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn test_load_corrupt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, b"{not json").unwrap();

        let store = TokenStore::at(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_overwrites_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("token.json"));

        store.save(&credential()).unwrap();
        let mut updated = credential();
        updated.access_token = "rotated".to_string();
        store.save(&updated).unwrap();

        assert_eq!(store.load().unwrap().access_token, "rotated");
        // No temp file left behind.
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("token.json"));

        store.clear().unwrap();
        store.save(&credential()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().join("token.json"));
        store.save(&credential()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
