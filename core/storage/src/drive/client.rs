//! Google Drive API client.

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;

use updrift_common::{Error, Result};

use super::auth::TokenManager;

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Folder MIME type marker.
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Chunk size for resumable uploads (must be a multiple of 256KB).
const CHUNK_SIZE: usize = 256 * 1024;

/// Response fields requested on file objects.
const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,parents,webViewLink,trashed";

/// Drive file metadata from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// File size in bytes (the API reports it as a string; folders omit it).
    #[serde(default)]
    pub size: Option<String>,
    /// Modified time.
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// Parent folder IDs.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Browser link.
    #[serde(default)]
    pub web_view_link: Option<String>,
    /// Trashed status.
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    files: Vec<DriveFile>,
}

/// Byte stream fed into resumable uploads.
pub type UploadStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    token_manager: Arc<TokenManager>,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new(token_manager: Arc<TokenManager>) -> Result<Self> {
        let http = Client::builder()
            .user_agent("Updrift/0.1")
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token_manager,
        })
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        let token = self.token_manager.get_access_token().await?;
        Ok(format!("Bearer {}", token))
    }

    /// Find non-trashed folders named `name` under `parent_id`.
    ///
    /// Duplicate-named siblings are legal in Drive, so all matches are
    /// returned; the caller picks.
    pub async fn find_folders(&self, parent_id: &str, name: &str) -> Result<Vec<DriveFile>> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let auth = self.auth_header().await?;

        let query = format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'"),
            parent_id,
            FOLDER_MIME
        );

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name,mimeType,trashed)"),
                ("pageSize", "10"),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to query folders: {}", e)))?;

        let list: FileListResponse = self.handle_response(response).await?;
        Ok(list.files)
    }

    /// Create a folder.
    pub async fn create_folder(&self, parent_id: &str, name: &str) -> Result<DriveFile> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let auth = self.auth_header().await?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent_id]
        });

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/json")
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create folder: {}", e)))?;

        self.handle_response(response).await
    }

    /// Upload a small file in one multipart request.
    pub async fn upload_multipart(
        &self,
        parent_id: &str,
        name: &str,
        data: Vec<u8>,
    ) -> Result<DriveFile> {
        let url = format!("{}/files?uploadType=multipart", DRIVE_UPLOAD_BASE);
        let auth = self.auth_header().await?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id]
        });
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| Error::Serialization(format!("Failed to serialize metadata: {}", e)))?;

        // Build multipart/related body by hand; the metadata part must come first.
        let boundary = "UpdriftBoundary";
        let mut body = Vec::with_capacity(data.len() + 512);

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata_json.as_bytes());
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}--", boundary).as_bytes());

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .query(&[("fields", FILE_FIELDS)])
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload file: {}", e)))?;

        self.handle_response(response).await
    }

    /// Start a resumable upload session.
    async fn start_resumable_upload(
        &self,
        parent_id: &str,
        name: &str,
        total_size: u64,
    ) -> Result<String> {
        let url = format!("{}/files?uploadType=resumable", DRIVE_UPLOAD_BASE);
        let auth = self.auth_header().await?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id]
        });

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Upload-Content-Length", total_size.to_string())
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to start resumable upload: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        // Upload URI comes back in the Location header.
        let upload_uri = response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| Error::Network("No upload URI in response".to_string()))?
            .to_str()
            .map_err(|e| Error::Network(format!("Invalid upload URI: {}", e)))?
            .to_string();

        Ok(upload_uri)
    }

    /// Upload a chunk to a resumable upload session.
    ///
    /// Returns the created file when the upload completed, `None` when the
    /// session expects more chunks (308 Resume Incomplete).
    async fn upload_chunk(
        &self,
        upload_uri: &str,
        data: &[u8],
        start_byte: u64,
        total_size: u64,
    ) -> Result<Option<DriveFile>> {
        let end_byte = start_byte + data.len() as u64 - 1;
        let content_range = format!("bytes {}-{}/{}", start_byte, end_byte, total_size);

        let response = self
            .http
            .put(upload_uri)
            .header(header::CONTENT_LENGTH, data.len().to_string())
            .header(header::CONTENT_RANGE, content_range)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload chunk: {}", e)))?;

        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let file: DriveFile = response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse upload response: {}", e)))?;
            Ok(Some(file))
        } else if status.as_u16() == 308 {
            Ok(None)
        } else {
            Err(self.status_error(response).await)
        }
    }

    /// Upload a large file by streaming chunks into a resumable session.
    pub async fn upload_resumable(
        &self,
        parent_id: &str,
        name: &str,
        mut stream: UploadStream,
        total_size: u64,
    ) -> Result<DriveFile> {
        let upload_uri = self
            .start_resumable_upload(parent_id, name, total_size)
            .await?;

        let mut bytes_uploaded = 0u64;
        let mut buffer = Vec::with_capacity(CHUNK_SIZE);

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);

            while buffer.len() >= CHUNK_SIZE {
                let chunk_to_upload: Vec<u8> = buffer.drain(..CHUNK_SIZE).collect();
                let result = self
                    .upload_chunk(&upload_uri, &chunk_to_upload, bytes_uploaded, total_size)
                    .await?;

                bytes_uploaded += chunk_to_upload.len() as u64;

                if let Some(file) = result {
                    return Ok(file);
                }
            }
        }

        if !buffer.is_empty() {
            let result = self
                .upload_chunk(&upload_uri, &buffer, bytes_uploaded, total_size)
                .await?;

            if let Some(file) = result {
                return Ok(file);
            }
        }

        Err(Error::Network("Upload did not complete".to_string()))
    }

    /// Grant writer access on a file to an email address.
    pub async fn create_permission(&self, file_id: &str, email: &str) -> Result<()> {
        let url = format!("{}/files/{}/permissions", DRIVE_API_BASE, file_id);
        let auth = self.auth_header().await?;

        let permission = serde_json::json!({
            "type": "user",
            "role": "writer",
            "emailAddress": email
        });

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/json")
            .query(&[("sendNotificationEmail", "false")])
            .json(&permission)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create permission: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.status_error(response).await)
        }
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse response: {}", e)))
        } else {
            Err(self.status_error(response).await)
        }
    }

    /// Map a non-success response onto the error taxonomy.
    async fn status_error(&self, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_status(status, &body)
    }
}

/// Classify an HTTP status (plus response body) into an error.
///
/// Drive reports rate limiting both as 429 and as 403 with a
/// `rateLimitExceeded`-family reason; both are transient. Storage-quota
/// 403s are permanent.
fn classify_status(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED => Error::Auth("Invalid or expired token".to_string()),
        StatusCode::NOT_FOUND => Error::NotFound(format!("Resource not found: {}", body)),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(format!("{} - {}", status, body)),
        StatusCode::FORBIDDEN => {
            if body.contains("storageQuotaExceeded") || body.contains("quotaExceeded") {
                Error::QuotaExceeded(format!("{} - {}", status, body))
            } else if body.contains("rateLimitExceeded") {
                Error::RateLimited(format!("{} - {}", status, body))
            } else {
                Error::PermissionDenied(format!("{} - {}", status, body))
            }
        }
        s if s.is_server_error() => Error::Network(format!("{} - {}", status, body)),
        _ => Error::Remote(format!("{} - {}", status, body)),
    }
}
