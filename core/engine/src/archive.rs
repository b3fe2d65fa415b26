//! Archive staging: bundle a directory subtree into one zip file.
//!
//! The staged archive lives in the process temp location and is deleted
//! when the [`StagedArchive`] guard drops, so cleanup happens on every
//! exit path of the invocation.

use std::fs::File;
use std::path::Path;

use chrono::Local;
use tempfile::TempPath;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use updrift_common::{Error, Result};

/// A zip archive staged in the temp directory.
///
/// Dropping the value deletes the file.
#[derive(Debug)]
pub struct StagedArchive {
    name: String,
    path: TempPath,
}

impl StagedArchive {
    /// Name the archive should get on the remote side.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Compress `dir` into a staged zip archive.
///
/// The tree is walked in deterministic lexicographic order; every regular
/// file becomes a deflated entry under its relative path, and directories
/// (including empty ones) become explicit entries so the tree shape
/// survives extraction. Symlinks are skipped.
///
/// # Errors
/// - `Io` on read failures or insufficient temp-disk space
pub fn build_archive(dir: &Path) -> Result<StagedArchive> {
    let staged = tempfile::Builder::new()
        .prefix("updrift-")
        .suffix(".zip")
        .tempfile()?;
    let (file, temp_path) = staged.into_parts();

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io_error)?;
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let entry_name = relative.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(entry_name.as_str(), options)
                .map_err(zip_error)?;
        } else if entry.file_type().is_file() {
            zip.start_file(entry_name.as_str(), options)
                .map_err(zip_error)?;
            let mut reader = File::open(entry.path())?;
            std::io::copy(&mut reader, &mut zip)?;
        }
    }

    zip.finish().map_err(zip_error)?;

    let name = archive_name(dir);
    debug!(archive = %name, staged = %temp_path.display(), "Archive staged");

    Ok(StagedArchive {
        name,
        path: temp_path,
    })
}

/// Remote file name for the archive: `<dirname>_<timestamp>.zip`.
fn archive_name(dir: &Path) -> String {
    let base = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    format!("{}_{}.zip", base, Local::now().format("%Y%m%d_%H%M%S"))
}

fn zip_error(err: zip::result::ZipError) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
}

fn io_error(err: walkdir::Error) -> Error {
    Error::Io(err.into())
}
