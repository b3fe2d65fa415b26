//! Google Drive implementation of the remote store.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use updrift_common::{Error, Result};

use crate::remote::{RemoteFile, RemoteFolder, RemoteStore};

use super::auth::{Credential, TokenManager};
use super::client::DriveClient;

/// Files above this size go through the resumable upload protocol.
const RESUMABLE_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Google Drive remote store.
pub struct DriveRemote {
    client: DriveClient,
    token_manager: Arc<TokenManager>,
}

impl DriveRemote {
    /// Create a Drive remote from an obtained credential.
    pub fn new(credential: Credential) -> Result<Self> {
        let token_manager = Arc::new(TokenManager::new(credential));
        let client = DriveClient::new(token_manager.clone())?;
        Ok(Self {
            client,
            token_manager,
        })
    }

    /// Current credential, possibly refreshed since construction.
    ///
    /// Callers persist this after a run so the next invocation starts from
    /// the newest token.
    pub async fn credential(&self) -> Credential {
        self.token_manager.current().await
    }
}

#[async_trait]
impl RemoteStore for DriveRemote {
    fn name(&self) -> &str {
        "drive"
    }

    async fn find_folders(&self, parent_id: &str, name: &str) -> Result<Vec<RemoteFolder>> {
        let folders = self.client.find_folders(parent_id, name).await?;
        Ok(folders
            .into_iter()
            .map(|f| RemoteFolder {
                id: f.id,
                name: f.name,
            })
            .collect())
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<RemoteFolder> {
        let folder = self.client.create_folder(parent_id, name).await?;
        Ok(RemoteFolder {
            id: folder.id,
            name: folder.name,
        })
    }

    async fn upload_file(&self, parent_id: &str, name: &str, source: &Path) -> Result<RemoteFile> {
        let size = tokio::fs::metadata(source).await?.len();

        let file = if size > RESUMABLE_THRESHOLD {
            // Stream from disk instead of buffering the whole file.
            let reader = tokio::fs::File::open(source).await?;
            let stream = ReaderStream::new(reader)
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::Io));
            self.client
                .upload_resumable(parent_id, name, Box::pin(stream), size)
                .await?
        } else {
            let data = tokio::fs::read(source).await?;
            self.client.upload_multipart(parent_id, name, data).await?
        };

        Ok(RemoteFile {
            size: file.size_bytes(),
            web_view_link: file.web_view_link.clone(),
            name: file.name,
            id: file.id,
        })
    }

    async fn grant_access(&self, file_id: &str, email: &str) -> Result<()> {
        self.client.create_permission(file_id, email).await
    }
}
