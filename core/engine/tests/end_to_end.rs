//! End-to-end orchestration scenarios against the in-memory remote.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use updrift_common::{Error, ModeFlags, TaskOutcome};
use updrift_engine::{run_for_host, HostInputs, Orchestrator, RetryConfig, UploadRequest};
use updrift_storage::memory::ROOT_ID;
use updrift_storage::MemoryRemote;

fn fast_retry() -> RetryConfig {
    RetryConfig::new(3)
        .with_initial_delay(Duration::from_millis(1))
        .with_jitter(false)
}

fn orchestrator(remote: &Arc<MemoryRemote>) -> Orchestrator {
    Orchestrator::new(remote.clone()).with_retry(fast_retry())
}

fn request(local: impl Into<PathBuf>, mode: ModeFlags) -> UploadRequest {
    UploadRequest {
        local_path: local.into(),
        parent_folder_id: None,
        mode,
        share_with: None,
    }
}

/// `output/` fixture: 3 files at the top, 1 subdirectory with 1 file.
fn output_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    fs::create_dir(&output).unwrap();
    fs::write(output.join("img_001.png"), b"png-1").unwrap();
    fs::write(output.join("img_002.png"), b"png-2").unwrap();
    fs::write(output.join("meta.json"), b"{}").unwrap();
    fs::create_dir(output.join("frames")).unwrap();
    fs::write(output.join("frames/frame_0.png"), b"frame").unwrap();
    dir
}

#[tokio::test]
async fn single_file_to_default_root() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img.png");
    fs::write(&img, b"pixels").unwrap();

    let remote = Arc::new(MemoryRemote::new());
    let report = orchestrator(&remote)
        .run(&request(&img, ModeFlags::default()))
        .await
        .unwrap();

    assert_eq!(report.results().len(), 1);
    assert_eq!(report.uploaded_count(), 1);
    assert!(report.is_success());
    assert!(report.render().contains("img.png -> uploaded"));

    // Exactly one file, directly in the default top-level folder.
    assert_eq!(remote.file_names_in(ROOT_ID), vec!["img.png"]);
    assert_eq!(remote.folder_count(), 0);
}

#[tokio::test]
async fn single_file_with_parent_folder_named_after_stem() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img.png");
    fs::write(&img, b"pixels").unwrap();

    let remote = Arc::new(MemoryRemote::new());
    let mode = ModeFlags {
        create_parent_folder: true,
        ..ModeFlags::default()
    };
    orchestrator(&remote).run(&request(&img, mode)).await.unwrap();

    let folder = remote.folder_id_by_path("img").unwrap();
    assert_eq!(remote.file_names_in(&folder), vec!["img.png"]);
}

#[tokio::test]
async fn directory_archive_mode_round_trips_all_files() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    let mode = ModeFlags {
        compress_to_archive: true,
        ..ModeFlags::default()
    };
    let report = orchestrator(&remote)
        .run(&request(tree.path().join("output"), mode))
        .await
        .unwrap();

    // Exactly one archive task.
    assert_eq!(report.results().len(), 1);
    assert_eq!(report.uploaded_count(), 1);

    let names = remote.file_names_in(ROOT_ID);
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("output_"));
    assert!(names[0].ends_with(".zip"));

    // Extraction yields all 4 original files at their relative paths.
    let file_id = match &report.results()[0].outcome {
        TaskOutcome::Uploaded { file_id, .. } => file_id.clone(),
        other => panic!("expected an upload, got {:?}", other),
    };
    let bytes = remote.file_bytes(&file_id).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

    let mut extracted = std::collections::BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        extracted.insert(entry.name().to_string(), contents);
    }

    assert_eq!(extracted.len(), 4);
    assert_eq!(extracted["img_001.png"], b"png-1");
    assert_eq!(extracted["frames/frame_0.png"], b"frame");
}

#[tokio::test]
async fn per_file_mode_mirrors_directory_shape() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    let mode = ModeFlags {
        create_parent_folder: true,
        preserve_subdirectories: true,
        ..ModeFlags::default()
    };
    let report = orchestrator(&remote)
        .run(&request(tree.path().join("output"), mode))
        .await
        .unwrap();

    assert_eq!(report.uploaded_count(), 4);

    // Remote folder structure is isomorphic to the local tree shape.
    let output = remote.folder_id_by_path("output").unwrap();
    let frames = remote.folder_id_by_path("output/frames").unwrap();
    assert_eq!(remote.folder_names_in(&output), vec!["frames"]);
    assert_eq!(
        remote.file_names_in(&output),
        vec!["img_001.png", "img_002.png", "meta.json"]
    );
    assert_eq!(remote.file_names_in(&frames), vec!["frame_0.png"]);
}

#[tokio::test]
async fn flatten_mode_puts_everything_in_one_folder() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    let mode = ModeFlags {
        preserve_subdirectories: false,
        ..ModeFlags::default()
    };
    let report = orchestrator(&remote)
        .run(&request(tree.path().join("output"), mode))
        .await
        .unwrap();

    assert_eq!(report.uploaded_count(), 4);
    assert_eq!(remote.folder_count(), 0);
    assert_eq!(
        remote.file_names_in(ROOT_ID),
        vec!["frame_0.png", "img_001.png", "img_002.png", "meta.json"]
    );
}

#[tokio::test]
async fn rerun_reuses_existing_folders() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    let mode = ModeFlags {
        create_parent_folder: true,
        preserve_subdirectories: true,
        ..ModeFlags::default()
    };

    orchestrator(&remote)
        .run(&request(tree.path().join("output"), mode))
        .await
        .unwrap();
    let folders_after_first = remote.folder_count();

    // Second invocation against the same remote parent: at most one
    // folder per name per parent across repeated runs.
    orchestrator(&remote)
        .run(&request(tree.path().join("output"), mode))
        .await
        .unwrap();

    assert_eq!(remote.folder_count(), folders_after_first);
    assert_eq!(remote.create_calls() as usize, folders_after_first);
}

#[tokio::test]
async fn explicit_parent_folder_id_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("img.png");
    fs::write(&img, b"pixels").unwrap();

    let remote = Arc::new(MemoryRemote::new());
    let parent = remote.add_folder(ROOT_ID, "renders");

    let report = orchestrator(&remote)
        .run(&UploadRequest {
            local_path: img,
            parent_folder_id: Some(parent.clone()),
            mode: ModeFlags::default(),
            share_with: None,
        })
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(remote.file_names_in(&parent), vec!["img.png"]);
    assert!(remote.file_names_in(ROOT_ID).is_empty());
}

#[tokio::test]
async fn share_target_is_applied_to_every_upload() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    let report = orchestrator(&remote)
        .run(&UploadRequest {
            local_path: tree.path().join("output"),
            parent_folder_id: None,
            mode: ModeFlags::default(),
            share_with: Some("friend@example.com".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(report.uploaded_count(), 4);
    for result in report.results() {
        if let TaskOutcome::Uploaded { file_id, .. } = &result.outcome {
            assert_eq!(remote.shared_with(file_id), vec!["friend@example.com"]);
        }
    }
}

#[tokio::test]
async fn resolution_failure_fails_one_task_but_batch_continues() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    // The first folder lookup (for `frames/`, walked first) fails
    // permanently; the top-level files need no resolution and proceed.
    remote.enqueue_folder_failure(Error::Remote("backend glitch".to_string()));

    let report = orchestrator(&remote)
        .run(&request(tree.path().join("output"), ModeFlags::default()))
        .await
        .unwrap();

    assert_eq!(report.results().len(), 4);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.uploaded_count(), 3);
    assert!(report.render().contains("Destination resolution failed"));
}

#[tokio::test]
async fn cancelled_run_starts_no_tasks() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = Orchestrator::new(remote.clone())
        .with_retry(fast_retry())
        .with_cancellation(cancel)
        .run(&request(tree.path().join("output"), ModeFlags::default()))
        .await
        .unwrap();

    assert_eq!(report.skipped_count(), 4);
    assert_eq!(remote.upload_calls(), 0);
}

#[tokio::test]
async fn missing_local_path_aborts_invocation() {
    let remote = Arc::new(MemoryRemote::new());
    let err = orchestrator(&remote)
        .run(&request("/no/such/path", ModeFlags::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert_eq!(remote.upload_calls(), 0);
}

#[tokio::test]
async fn bounded_parallelism_uploads_everything() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    let report = Orchestrator::new(remote.clone())
        .with_retry(fast_retry())
        .with_parallelism(3)
        .run(&request(tree.path().join("output"), ModeFlags::default()))
        .await
        .unwrap();

    assert_eq!(report.uploaded_count(), 4);
}

#[tokio::test]
async fn malformed_descriptor_is_reported_before_any_side_effect() {
    let report = run_for_host(HostInputs {
        local_path: "output/img.png".to_string(),
        client_json: "{this is not json".to_string(),
        ..HostInputs::default()
    })
    .await;

    assert!(report.starts_with("Error: Configuration error:"));
}

#[tokio::test]
async fn empty_directory_yields_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty");
    fs::create_dir(&empty).unwrap();

    let remote = Arc::new(MemoryRemote::new());
    let report = orchestrator(&remote)
        .run(&request(&empty, ModeFlags::default()))
        .await
        .unwrap();

    assert!(report.results().is_empty());
    assert!(report.render().contains("no files to upload"));
}

#[tokio::test]
async fn archive_staging_is_cleaned_up_after_run() {
    let tree = output_tree();
    let remote = Arc::new(MemoryRemote::new());

    let mode = ModeFlags {
        compress_to_archive: true,
        ..ModeFlags::default()
    };
    let report = orchestrator(&remote)
        .run(&request(tree.path().join("output"), mode))
        .await
        .unwrap();

    // The staged temp file referenced by the task no longer exists.
    let staged_path: &Path = &report.results()[0].task.source_path;
    assert!(!staged_path.exists());
}
