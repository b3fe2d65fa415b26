//! Remote store trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use updrift_common::Result;

/// A folder object on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    /// Provider-assigned folder identifier.
    pub id: String,
    /// Folder name.
    pub name: String,
}

/// A file object created on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Provider-assigned file identifier.
    pub id: String,
    /// File name.
    pub name: String,
    /// Browser link to view the file, when the provider returns one.
    pub web_view_link: Option<String>,
    /// Size in bytes, when reported.
    pub size: Option<u64>,
}

/// Remote storage backend.
///
/// The orchestration layer only talks to this trait; the real Drive
/// backend and the in-memory test backend both implement it. Methods are
/// single API calls: retry policy is applied by the caller, not here.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Backend name (e.g. "drive", "memory").
    fn name(&self) -> &str;

    /// Find non-trashed child folders of `parent_id` named `name`.
    ///
    /// Remote systems permit duplicate-named siblings, so this returns all
    /// matches; callers decide the tie-break.
    async fn find_folders(&self, parent_id: &str, name: &str) -> Result<Vec<RemoteFolder>>;

    /// Create a new folder named `name` under `parent_id`.
    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<RemoteFolder>;

    /// Upload the local file at `source` as `name` into `parent_id`.
    ///
    /// # Postconditions
    /// - Exactly one remote file object is created per successful call
    ///
    /// # Errors
    /// - Local read failures
    /// - Network/API errors (transient ones are retried by the executor)
    async fn upload_file(&self, parent_id: &str, name: &str, source: &Path) -> Result<RemoteFile>;

    /// Grant write access on a file to an email address.
    async fn grant_access(&self, file_id: &str, email: &str) -> Result<()>;
}
