//! Upload execution with retry, sharing, and bounded-parallel batches.

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use updrift_common::{Result, TaskOutcome, UploadResult, UploadTask};
use updrift_storage::{RemoteFile, RemoteStore};

use crate::retry::RetryConfig;

/// Executes [`UploadTask`]s against a remote store.
pub struct UploadExecutor {
    store: Arc<dyn RemoteStore>,
    retry: RetryConfig,
}

impl UploadExecutor {
    /// Create an executor with the given retry policy.
    pub fn new(store: Arc<dyn RemoteStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Execute one task to completion.
    ///
    /// Never returns an error: every failure mode ends up inside the
    /// [`UploadResult`], with the attempt count actually used. A sharing
    /// failure after a successful upload is recorded as `share_error`, not
    /// as a task failure.
    pub async fn upload(&self, task: UploadTask) -> UploadResult {
        let mut attempts = 0u32;

        let outcome = loop {
            attempts += 1;
            match self.try_upload(&task).await {
                Ok(file) => break Ok(file),
                Err(err) if err.is_transient() && attempts <= self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempts - 1);
                    warn!(
                        file = %task.remote_name,
                        "Upload attempt {} failed: {}. Retrying in {:?}...",
                        attempts, err, delay
                    );
                    sleep(delay).await;
                }
                Err(err) => break Err(err),
            }
        };

        match outcome {
            Ok(file) => {
                debug!(file = %task.remote_name, id = %file.id, attempts, "Upload complete");
                let share_error = self.share_if_requested(&task, &file).await;
                UploadResult {
                    outcome: TaskOutcome::Uploaded {
                        file_id: file.id,
                        web_view_link: file.web_view_link,
                    },
                    task,
                    attempts,
                    share_error,
                }
            }
            Err(err) => {
                warn!(file = %task.remote_name, attempts, "Upload failed: {}", err);
                UploadResult {
                    outcome: TaskOutcome::Failed {
                        reason: err.to_string(),
                    },
                    task,
                    attempts,
                    share_error: None,
                }
            }
        }
    }

    async fn try_upload(&self, task: &UploadTask) -> Result<RemoteFile> {
        self.store
            .upload_file(&task.dest_folder_id, &task.remote_name, &task.source_path)
            .await
    }

    /// Issue the permission grant after a successful upload.
    async fn share_if_requested(&self, task: &UploadTask, file: &RemoteFile) -> Option<String> {
        let email = task.share_with.as_deref()?;
        match self.store.grant_access(&file.id, email).await {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    file = %task.remote_name,
                    email = %email,
                    "Upload succeeded but sharing failed: {}",
                    err
                );
                Some(err.to_string())
            }
        }
    }

    /// Execute a batch of tasks, best effort, results in input order.
    ///
    /// `parallelism` bounds concurrent transfers; 1 means strictly
    /// sequential. The cancellation token is checked before each task
    /// starts: in-flight uploads run to completion, tasks not yet started
    /// are reported as skipped.
    pub async fn run_batch(
        &self,
        tasks: Vec<UploadTask>,
        parallelism: usize,
        cancel: &CancellationToken,
    ) -> Vec<UploadResult> {
        let parallelism = parallelism.max(1);

        futures::stream::iter(tasks.into_iter().map(|task| async move {
            if cancel.is_cancelled() {
                return UploadResult {
                    task,
                    outcome: TaskOutcome::Skipped,
                    attempts: 0,
                    share_error: None,
                };
            }
            self.upload(task).await
        }))
        .buffered(parallelism)
        .collect()
        .await
    }
}
