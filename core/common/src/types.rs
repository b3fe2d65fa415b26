//! Common types used throughout Updrift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Mode flags controlling how a local path is mapped onto the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFlags {
    /// Bundle a directory into a single zip archive before uploading.
    pub compress_to_archive: bool,
    /// Create a remote folder named after the upload source and place
    /// everything under it.
    pub create_parent_folder: bool,
    /// Mirror nested local directories as remote folders. When false, all
    /// files land directly in the destination folder.
    pub preserve_subdirectories: bool,
}

impl Default for ModeFlags {
    fn default() -> Self {
        Self {
            compress_to_archive: false,
            create_parent_folder: false,
            preserve_subdirectories: true,
        }
    }
}

/// One file transfer to perform.
///
/// Immutable once constructed; the executor produces exactly one
/// [`UploadResult`] per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTask {
    /// Local file to read.
    pub source_path: PathBuf,
    /// Name the file gets on the remote side. Usually the local file name,
    /// but differs for staged archives.
    pub remote_name: String,
    /// Remote folder the file is created in.
    pub dest_folder_id: String,
    /// Email address to grant writer access to after a successful upload.
    pub share_with: Option<String>,
}

/// What happened to a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// The file was created remotely.
    Uploaded {
        /// Remote file object identifier.
        file_id: String,
        /// Browser link to the uploaded file, when the API returned one.
        web_view_link: Option<String>,
    },
    /// All attempts failed; the rendered error is kept as plain text.
    Failed { reason: String },
    /// Cancellation was observed before this task started.
    Skipped,
}

/// Result of executing one [`UploadTask`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// The task this result belongs to.
    pub task: UploadTask,
    /// Terminal outcome.
    pub outcome: TaskOutcome,
    /// Number of upload attempts actually made (0 for skipped tasks).
    pub attempts: u32,
    /// Set when the upload succeeded but the follow-up sharing grant did
    /// not. A partial success, not a failure.
    pub share_error: Option<String>,
}

impl UploadResult {
    /// Whether the file landed remotely (sharing problems don't count
    /// against this).
    pub fn is_uploaded(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Uploaded { .. })
    }

    /// Browser link for the uploaded file, if any.
    pub fn web_view_link(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Uploaded { web_view_link, .. } => web_view_link.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for UploadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            TaskOutcome::Uploaded { file_id, .. } => {
                write!(
                    f,
                    "{} -> uploaded (id: {}, attempts: {})",
                    self.task.remote_name, file_id, self.attempts
                )?;
                if let Some(err) = &self.share_error {
                    write!(f, " [sharing failed: {}]", err)?;
                }
                Ok(())
            }
            TaskOutcome::Failed { reason } => write!(
                f,
                "{} -> failed: {} (attempts: {})",
                self.task.remote_name, reason, self.attempts
            ),
            TaskOutcome::Skipped => {
                write!(f, "{} -> skipped (cancelled)", self.task.remote_name)
            }
        }
    }
}
