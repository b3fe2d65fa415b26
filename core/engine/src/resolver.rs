//! Remote folder resolution with invocation-scoped memoization.
//!
//! Maps local relative paths onto remote folder ids, creating only what is
//! missing and reusing what exists. The cache guarantees at most one
//! folder creation per distinct local subtree path per invocation; it is
//! never persisted because remote ids are not stable across runs without
//! re-querying name collisions.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use updrift_common::{Error, Result};
use updrift_storage::RemoteStore;

use crate::retry::{RetryConfig, RetryExecutor};

/// Create-or-reuse resolver rooted at one remote parent folder.
pub struct FolderResolver {
    store: Arc<dyn RemoteStore>,
    retry: RetryExecutor,
    root_id: String,
    cache: HashMap<PathBuf, String>,
}

impl FolderResolver {
    /// Create a resolver rooted at `root_id`.
    pub fn new(store: Arc<dyn RemoteStore>, root_id: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            store,
            retry: RetryExecutor::new(retry),
            root_id: root_id.into(),
            cache: HashMap::new(),
        }
    }

    /// The remote id everything resolves under.
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Resolve a relative path to a remote folder id, creating missing
    /// ancestors in order.
    ///
    /// An empty path resolves to the root with zero API calls. Cached
    /// segments are reused without touching the remote.
    ///
    /// # Errors
    /// - `Config` on absolute or parent-escaping paths
    /// - `Remote`-class errors once retries are exhausted
    pub async fn resolve(&mut self, relative: &Path) -> Result<String> {
        let mut current = self.root_id.clone();
        let mut walked = PathBuf::new();

        for component in relative.components() {
            let name = match component {
                Component::Normal(name) => name.to_string_lossy().into_owned(),
                Component::CurDir => continue,
                other => {
                    return Err(Error::Config(format!(
                        "Folder path must be relative, got component {:?}",
                        other
                    )))
                }
            };

            walked.push(&name);

            if let Some(id) = self.cache.get(&walked) {
                current = id.clone();
                continue;
            }

            let id = self.find_or_create(&current, &name).await?;
            debug!(path = %walked.display(), id = %id, "Resolved remote folder");
            self.cache.insert(walked.clone(), id.clone());
            current = id;
        }

        Ok(current)
    }

    /// One create-or-reuse step under a known parent.
    async fn find_or_create(&self, parent_id: &str, name: &str) -> Result<String> {
        let matches = self
            .retry
            .execute(|| self.store.find_folders(parent_id, name))
            .await?;

        if let Some(first) = matches.first() {
            if matches.len() > 1 {
                // Drive permits duplicate-named siblings; first match wins.
                warn!(
                    name = %name,
                    parent = %parent_id,
                    matches = matches.len(),
                    "Multiple remote folders share this name, using the first"
                );
            }
            return Ok(first.id.clone());
        }

        let folder = self
            .retry
            .execute(|| self.store.create_folder(parent_id, name))
            .await?;
        Ok(folder.id)
    }
}
