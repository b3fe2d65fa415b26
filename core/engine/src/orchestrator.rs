//! Upload orchestration: composes credentials, folder resolution, archive
//! staging, and the upload executor into one invocation.
//!
//! Control flow is strictly top-down: the orchestrator drives every other
//! component and nothing calls back into it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use walkdir::WalkDir;

use updrift_common::{Error, ModeFlags, Result, TaskOutcome, UploadResult, UploadTask};
use updrift_storage::{
    AuthorizationSource, Authorizer, ConsentOptions, DriveRemote, RemoteStore, TokenStore,
};

use crate::archive::build_archive;
use crate::executor::UploadExecutor;
use crate::report::RunReport;
use crate::resolver::FolderResolver;
use crate::retry::RetryConfig;

/// Remote folder alias used when no parent folder id is supplied.
const DEFAULT_ROOT: &str = "root";

/// One upload invocation, as seen by the engine.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Local file or directory to upload.
    pub local_path: PathBuf,
    /// Remote parent folder id; `None` (or empty) means the top-level default.
    pub parent_folder_id: Option<String>,
    /// Mode flags.
    pub mode: ModeFlags,
    /// Email address to share uploaded files with.
    pub share_with: Option<String>,
}

/// A task that could be planned, or one that already failed during
/// destination resolution.
enum Planned {
    Ready(UploadTask),
    Unresolvable(UploadResult),
}

/// Drives one invocation against a remote store.
pub struct Orchestrator {
    store: Arc<dyn RemoteStore>,
    retry: RetryConfig,
    parallelism: usize,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator with sequential execution and default retries.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            retry: RetryConfig::default(),
            parallelism: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the retry policy (shared by resolution and uploads).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Bound concurrent transfers; 1 means strictly sequential.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Attach a cancellation token checked between tasks.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one invocation.
    ///
    /// # Errors
    /// - `Io` when the local path is unreadable or archive staging fails
    /// - `Config` on invalid inputs
    ///
    /// Per-task failures (including destination resolution after retries)
    /// never abort the batch; they are recorded in the report.
    pub async fn run(&self, request: &UploadRequest) -> Result<RunReport> {
        let local = request.local_path.canonicalize()?;
        let metadata = std::fs::metadata(&local)?;

        let root_id = request
            .parent_folder_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_ROOT)
            .to_string();

        let source_name = path_name(&local);
        info!(source = %source_name, root = %root_id, "Starting upload run");

        let mut resolver = FolderResolver::new(self.store.clone(), root_id, self.retry.clone());

        // The staged archive must outlive the batch; dropping it deletes
        // the temp file on every exit path.
        let mut staged_guard = None;

        let planned = if metadata.is_file() {
            self.plan_single_file(request, &local, &mut resolver).await
        } else if request.mode.compress_to_archive {
            self.plan_archive(request, &local, &mut resolver, &mut staged_guard)
                .await?
        } else {
            self.plan_tree(request, &local, &mut resolver).await?
        };

        let results = self.execute(planned).await;
        Ok(RunReport::new(source_name, results))
    }

    /// Plan the one task of a single-file upload.
    async fn plan_single_file(
        &self,
        request: &UploadRequest,
        local: &Path,
        resolver: &mut FolderResolver,
    ) -> Vec<Planned> {
        let remote_name = path_name(local);

        // Identity destination unless a parent folder named after the
        // source is requested; the stem avoids folders that look like files.
        let dest = if request.mode.create_parent_folder {
            let stem = local
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| remote_name.clone());
            resolver.resolve(Path::new(&stem)).await
        } else {
            Ok(resolver.root_id().to_string())
        };

        vec![planned_from(
            dest,
            local.to_path_buf(),
            remote_name,
            request.share_with.clone(),
        )]
    }

    /// Stage a directory as one archive and plan its single task.
    async fn plan_archive(
        &self,
        request: &UploadRequest,
        local: &Path,
        resolver: &mut FolderResolver,
        staged_guard: &mut Option<crate::archive::StagedArchive>,
    ) -> Result<Vec<Planned>> {
        let dir = local.to_path_buf();
        let staged = tokio::task::spawn_blocking(move || build_archive(&dir))
            .await
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        let base = base_prefix(request, local);
        let dest = resolver.resolve(&base).await;

        let planned = planned_from(
            dest,
            staged.path().to_path_buf(),
            staged.name().to_string(),
            request.share_with.clone(),
        );
        *staged_guard = Some(staged);

        Ok(vec![planned])
    }

    /// Walk a directory and plan one task per file.
    async fn plan_tree(
        &self,
        request: &UploadRequest,
        local: &Path,
        resolver: &mut FolderResolver,
    ) -> Result<Vec<Planned>> {
        let base = base_prefix(request, local);
        let mut planned = Vec::new();

        for entry in WalkDir::new(local).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(local) else {
                continue;
            };

            let dest_rel = if request.mode.preserve_subdirectories {
                base.join(relative.parent().unwrap_or_else(|| Path::new("")))
            } else {
                base.clone()
            };

            let dest = resolver.resolve(&dest_rel).await;
            planned.push(planned_from(
                dest,
                entry.path().to_path_buf(),
                path_name(entry.path()),
                request.share_with.clone(),
            ));
        }

        Ok(planned)
    }

    /// Execute ready tasks, splicing pre-failed ones back in input order.
    async fn execute(&self, planned: Vec<Planned>) -> Vec<UploadResult> {
        let mut slots: Vec<Option<UploadResult>> = Vec::with_capacity(planned.len());
        let mut ready = Vec::new();

        for item in planned {
            match item {
                Planned::Ready(task) => {
                    slots.push(None);
                    ready.push((slots.len() - 1, task));
                }
                Planned::Unresolvable(result) => slots.push(Some(result)),
            }
        }

        let indices: Vec<usize> = ready.iter().map(|(i, _)| *i).collect();
        let tasks: Vec<UploadTask> = ready.into_iter().map(|(_, t)| t).collect();

        let executor = UploadExecutor::new(self.store.clone(), self.retry.clone());
        let executed = executor
            .run_batch(tasks, self.parallelism, &self.cancel)
            .await;

        for (index, result) in indices.into_iter().zip(executed) {
            slots[index] = Some(result);
        }

        slots.into_iter().flatten().collect()
    }
}

/// Build a planned item from a resolution outcome.
fn planned_from(
    dest: Result<String>,
    source_path: PathBuf,
    remote_name: String,
    share_with: Option<String>,
) -> Planned {
    match dest {
        Ok(dest_folder_id) => Planned::Ready(UploadTask {
            source_path,
            remote_name,
            dest_folder_id,
            share_with,
        }),
        Err(err) => Planned::Unresolvable(UploadResult {
            task: UploadTask {
                source_path,
                remote_name,
                dest_folder_id: String::new(),
                share_with,
            },
            outcome: TaskOutcome::Failed {
                reason: format!("Destination resolution failed: {}", err),
            },
            attempts: 0,
            share_error: None,
        }),
    }
}

/// Relative remote prefix under the resolver root for a directory upload.
fn base_prefix(request: &UploadRequest, local: &Path) -> PathBuf {
    if request.mode.create_parent_folder {
        PathBuf::from(path_name(local))
    } else {
        PathBuf::new()
    }
}

fn path_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

/// Raw inputs as supplied by the invoking host.
#[derive(Debug, Clone, Default)]
pub struct HostInputs {
    /// Local file or directory path.
    pub local_path: String,
    /// Remote parent folder id; empty means the top-level default.
    pub parent_folder_id: String,
    /// Interactive client descriptor JSON (may be empty).
    pub client_json: String,
    /// Service-identity key JSON (may be empty).
    pub service_key_json: String,
    /// Mode flags.
    pub mode: ModeFlags,
    /// Optional share target email (empty means none).
    pub share_with: String,
    /// Concurrent transfer bound; 0 or 1 means sequential.
    pub parallelism: usize,
    /// Interactive-consent behavior.
    pub consent: ConsentOptions,
}

/// Run a full invocation for the host: resolve credentials, upload, and
/// persist the (possibly refreshed) token.
///
/// # Errors
/// - `Config` before any network call on malformed inputs
/// - `Auth` when no credential can be obtained
/// - `Io` when nothing uploadable can be produced
pub async fn run_host(inputs: HostInputs) -> Result<RunReport> {
    // Fail fast on malformed descriptors, before any network side effects.
    let source = AuthorizationSource::from_inputs(&inputs.client_json, &inputs.service_key_json)?;

    let token_store = TokenStore::open_default()?;
    let authorizer =
        Authorizer::new(token_store.clone()).with_consent_options(inputs.consent.clone());
    let credential = authorizer.obtain(&source).await?;

    let remote = Arc::new(DriveRemote::new(credential)?);
    let store: Arc<dyn RemoteStore> = remote.clone();

    let request = UploadRequest {
        local_path: PathBuf::from(&inputs.local_path),
        parent_folder_id: (!inputs.parent_folder_id.is_empty())
            .then(|| inputs.parent_folder_id.clone()),
        mode: inputs.mode,
        share_with: (!inputs.share_with.is_empty()).then(|| inputs.share_with.clone()),
    };

    let report = Orchestrator::new(store)
        .with_parallelism(inputs.parallelism)
        .run(&request)
        .await?;

    // Keep the next invocation from re-authorizing.
    if let Err(err) = token_store.save(&remote.credential().await) {
        warn!("Could not persist refreshed credential: {}", err);
    }

    Ok(report)
}

/// Host-facing wrapper: every failure becomes a plain-text report string.
pub async fn run_for_host(inputs: HostInputs) -> String {
    match run_host(inputs).await {
        Ok(report) => report.render(),
        Err(err) => format!("Error: {}", err),
    }
}
