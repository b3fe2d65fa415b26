//! Local directory listing for the host's "list directory" step.
//!
//! Boundary contract: always returns a single displayable string. A
//! missing path, a non-directory, or an unreadable entry produce explicit
//! message strings, never an error.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};

/// Flags for [`list_directory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Include entries whose names start with a dot.
    pub show_hidden: bool,
    /// One detail line per entry (type, size, mtime) instead of bare names.
    pub show_details: bool,
}

/// Produce a listing string for a directory.
pub fn list_directory(path: &Path, options: ListOptions) -> String {
    if !path.exists() {
        return format!("Error: Path does not exist: {}", path.display());
    }
    if !path.is_dir() {
        return format!("Error: Path is not a directory: {}", path.display());
    }

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => return format!("Error: {}", err),
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| options.show_hidden || !name.starts_with('.'))
        .collect();
    names.sort();

    if names.is_empty() {
        return "(empty)".to_string();
    }

    if !options.show_details {
        return names.join("\n");
    }

    let lines: Vec<String> = names
        .iter()
        .map(|name| detail_line(&path.join(name), name))
        .collect();
    lines.join("\n")
}

fn detail_line(entry_path: &Path, name: &str) -> String {
    let metadata = match fs::symlink_metadata(entry_path) {
        Ok(metadata) => metadata,
        Err(_) => return format!("? ?????????? ???????????????? {}", name),
    };

    let type_char = if metadata.is_dir() {
        'd'
    } else if metadata.file_type().is_symlink() {
        'l'
    } else {
        '-'
    };

    let mtime = metadata
        .modified()
        .ok()
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "????-??-?? ??:??".to_string());

    format!("{} {:>10} {} {}", type_char, metadata.len(), mtime, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn sample_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.txt"))
            .unwrap()
            .write_all(b"hello")
            .unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        dir
    }

    #[test]
    fn test_plain_listing_sorted_without_hidden() {
        let dir = sample_dir();
        let listing = list_directory(dir.path(), ListOptions::default());
        assert_eq!(listing, "a.txt\nb.txt\nsub");
    }

    #[test]
    fn test_hidden_entries_included_on_request() {
        let dir = sample_dir();
        let listing = list_directory(
            dir.path(),
            ListOptions {
                show_hidden: true,
                show_details: false,
            },
        );
        assert_eq!(listing, ".hidden\na.txt\nb.txt\nsub");
    }

    #[test]
    fn test_details_have_type_and_size() {
        let dir = sample_dir();
        let listing = list_directory(
            dir.path(),
            ListOptions {
                show_hidden: false,
                show_details: true,
            },
        );

        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with('-'));
        assert!(lines[1].contains("5"));
        assert!(lines[1].ends_with("b.txt"));
        assert!(lines[2].starts_with('d'));
    }

    #[test]
    fn test_missing_path_is_message_not_panic() {
        let listing = list_directory(Path::new("/no/such/dir"), ListOptions::default());
        assert!(listing.starts_with("Error: Path does not exist"));
    }

    #[test]
    fn test_file_path_is_message() {
        let dir = sample_dir();
        let listing = list_directory(&dir.path().join("a.txt"), ListOptions::default());
        assert!(listing.starts_with("Error: Path is not a directory"));
    }

    #[test]
    fn test_empty_directory_message() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(list_directory(dir.path(), ListOptions::default()), "(empty)");
    }
}
