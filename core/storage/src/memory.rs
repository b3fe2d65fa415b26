//! In-memory remote store for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use updrift_common::{Error, Result};

use crate::remote::{RemoteFile, RemoteFolder, RemoteStore};

/// Root folder identifier, mirroring Drive's alias.
pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone)]
struct FolderNode {
    id: String,
    parent_id: String,
    name: String,
}

#[derive(Debug, Clone)]
struct FileNode {
    id: String,
    parent_id: String,
    name: String,
    data: Vec<u8>,
    shared_with: Vec<String>,
}

#[derive(Default)]
struct Inner {
    folders: Vec<FolderNode>,
    files: Vec<FileNode>,
    // Scripted failures, consumed front-to-back by the matching operation.
    folder_failures: VecDeque<Error>,
    upload_failures: VecDeque<Error>,
    share_failures: VecDeque<Error>,
    // Call counters for cache/retry assertions.
    find_calls: u32,
    create_calls: u32,
    upload_calls: u32,
}

/// In-memory remote store.
///
/// Useful for testing and development. Supports scripted failure
/// injection (each enqueued error is returned by exactly one call of the
/// matching operation) and call counters so tests can assert on retry and
/// cache behavior. All data is lost on drop.
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl MemoryRemote {
    /// Create an empty remote containing only the root folder.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Queue an error for a future `find_folders`/`create_folder` call.
    pub fn enqueue_folder_failure(&self, err: Error) {
        self.inner.lock().unwrap().folder_failures.push_back(err);
    }

    /// Queue an error for a future `upload_file` call.
    pub fn enqueue_upload_failure(&self, err: Error) {
        self.inner.lock().unwrap().upload_failures.push_back(err);
    }

    /// Queue an error for a future `grant_access` call.
    pub fn enqueue_share_failure(&self, err: Error) {
        self.inner.lock().unwrap().share_failures.push_back(err);
    }

    /// Pre-seed a folder, returning its id.
    pub fn add_folder(&self, parent_id: &str, name: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        inner.folders.push(FolderNode {
            id: id.clone(),
            parent_id: parent_id.to_string(),
            name: name.to_string(),
        });
        id
    }

    /// Number of folders in existence (root excluded).
    pub fn folder_count(&self) -> usize {
        self.inner.lock().unwrap().folders.len()
    }

    /// How many `create_folder` calls were served.
    pub fn create_calls(&self) -> u32 {
        self.inner.lock().unwrap().create_calls
    }

    /// How many `find_folders` calls were served.
    pub fn find_calls(&self) -> u32 {
        self.inner.lock().unwrap().find_calls
    }

    /// How many `upload_file` calls were served (including failed ones).
    pub fn upload_calls(&self) -> u32 {
        self.inner.lock().unwrap().upload_calls
    }

    /// Resolve a `/`-separated path of folder names from the root.
    pub fn folder_id_by_path(&self, path: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let mut current = ROOT_ID.to_string();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = inner
                .folders
                .iter()
                .find(|f| f.parent_id == current && f.name == segment)?
                .id
                .clone();
        }
        Some(current)
    }

    /// Names of files directly inside a folder, sorted.
    pub fn file_names_in(&self, folder_id: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut names: Vec<String> = inner
            .files
            .iter()
            .filter(|f| f.parent_id == folder_id)
            .map(|f| f.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Names of child folders of a folder, sorted.
    pub fn folder_names_in(&self, folder_id: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut names: Vec<String> = inner
            .folders
            .iter()
            .filter(|f| f.parent_id == folder_id)
            .map(|f| f.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Stored bytes of an uploaded file.
    pub fn file_bytes(&self, file_id: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .iter()
            .find(|f| f.id == file_id)
            .map(|f| f.data.clone())
    }

    /// Emails a file has been shared with.
    pub fn shared_with(&self, file_id: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .iter()
            .find(|f| f.id == file_id)
            .map(|f| f.shared_with.clone())
            .unwrap_or_default()
    }

    fn folder_exists(inner: &Inner, id: &str) -> bool {
        id == ROOT_ID || inner.folders.iter().any(|f| f.id == id)
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_folders(&self, parent_id: &str, name: &str) -> Result<Vec<RemoteFolder>> {
        let mut inner = self.inner.lock().unwrap();
        inner.find_calls += 1;

        if let Some(err) = inner.folder_failures.pop_front() {
            return Err(err);
        }

        Ok(inner
            .folders
            .iter()
            .filter(|f| f.parent_id == parent_id && f.name == name)
            .map(|f| RemoteFolder {
                id: f.id.clone(),
                name: f.name.clone(),
            })
            .collect())
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<RemoteFolder> {
        let mut inner = self.inner.lock().unwrap();
        inner.create_calls += 1;

        if let Some(err) = inner.folder_failures.pop_front() {
            return Err(err);
        }

        if !Self::folder_exists(&inner, parent_id) {
            return Err(Error::NotFound(format!(
                "Parent folder not found: {}",
                parent_id
            )));
        }

        let folder = FolderNode {
            id: Uuid::new_v4().to_string(),
            parent_id: parent_id.to_string(),
            name: name.to_string(),
        };
        let result = RemoteFolder {
            id: folder.id.clone(),
            name: folder.name.clone(),
        };
        inner.folders.push(folder);
        Ok(result)
    }

    async fn upload_file(&self, parent_id: &str, name: &str, source: &Path) -> Result<RemoteFile> {
        // Read outside the lock so local I/O errors surface like the real
        // backend's.
        let data = std::fs::read(source)?;

        let mut inner = self.inner.lock().unwrap();
        inner.upload_calls += 1;

        if let Some(err) = inner.upload_failures.pop_front() {
            return Err(err);
        }

        if !Self::folder_exists(&inner, parent_id) {
            return Err(Error::Remote(format!(
                "Invalid parent folder: {}",
                parent_id
            )));
        }

        let file = FileNode {
            id: Uuid::new_v4().to_string(),
            parent_id: parent_id.to_string(),
            name: name.to_string(),
            data,
            shared_with: Vec::new(),
        };
        let result = RemoteFile {
            id: file.id.clone(),
            name: file.name.clone(),
            web_view_link: Some(format!("https://memory.example/view/{}", file.id)),
            size: Some(file.data.len() as u64),
        };
        inner.files.push(file);
        Ok(result)
    }

    async fn grant_access(&self, file_id: &str, email: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(err) = inner.share_failures.pop_front() {
            return Err(err);
        }

        let file = inner
            .files
            .iter_mut()
            .find(|f| f.id == file_id)
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", file_id)))?;
        file.shared_with.push(email.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[tokio::test]
    async fn test_create_and_find_folder() {
        let remote = MemoryRemote::new();

        let created = remote.create_folder(ROOT_ID, "output").await.unwrap();
        let found = remote.find_folders(ROOT_ID, "output").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, created.id);
        assert_eq!(remote.folder_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_named_folders_all_returned() {
        let remote = MemoryRemote::new();
        remote.add_folder(ROOT_ID, "output");
        remote.add_folder(ROOT_ID, "output");

        let found = remote.find_folders(ROOT_ID, "output").await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_and_share() {
        let remote = MemoryRemote::new();
        let file = temp_file(b"pixels");

        let uploaded = remote
            .upload_file(ROOT_ID, "img.png", file.path())
            .await
            .unwrap();
        assert_eq!(uploaded.size, Some(6));
        assert_eq!(remote.file_names_in(ROOT_ID), vec!["img.png"]);

        remote
            .grant_access(&uploaded.id, "friend@example.com")
            .await
            .unwrap();
        assert_eq!(remote.shared_with(&uploaded.id), vec!["friend@example.com"]);
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let remote = MemoryRemote::new();
        let file = temp_file(b"data");

        remote.enqueue_upload_failure(Error::Network("flaky".to_string()));

        assert!(remote
            .upload_file(ROOT_ID, "a.bin", file.path())
            .await
            .is_err());
        assert!(remote
            .upload_file(ROOT_ID, "a.bin", file.path())
            .await
            .is_ok());
        assert_eq!(remote.upload_calls(), 2);
    }

    #[tokio::test]
    async fn test_upload_missing_source_is_io() {
        let remote = MemoryRemote::new();
        let err = remote
            .upload_file(ROOT_ID, "a.bin", Path::new("/no/such/file"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_folder_id_by_path() {
        let remote = MemoryRemote::new();
        let a = remote.add_folder(ROOT_ID, "a");
        let b = remote.add_folder(&a, "b");

        assert_eq!(remote.folder_id_by_path("a/b"), Some(b));
        assert_eq!(remote.folder_id_by_path(""), Some(ROOT_ID.to_string()));
        assert_eq!(remote.folder_id_by_path("a/missing"), None);
    }
}
