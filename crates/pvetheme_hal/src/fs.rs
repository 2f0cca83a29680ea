//! File system helpers
//!
//! Thin wrappers over `std::fs` that attach the operation and path to every
//! error, plus the two primitives the theme tooling relies on: atomic
//! replacement of a file and listing files by glob pattern.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{HalError, HalResult};

/// Read a whole file.
pub fn read<P: AsRef<Path>>(path: P) -> HalResult<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| HalError::io_error("read", Some(path), e))
}

/// Read a whole file, mapping "not found" to `None`.
pub fn read_optional<P: AsRef<Path>>(path: P) -> HalResult<Option<Vec<u8>>> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HalError::io_error("read", Some(path), e)),
    }
}

/// Replace `path` with `contents` via a sibling temp file and a rename.
///
/// Readers never observe a half-written file. Permissions of an existing
/// target are carried over; new files get 0644 on Unix.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> HalResult<()> {
    let path = path.as_ref();
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| HalError::io_error("write_atomic_create", Some(parent), e))?;
    tmp.write_all(contents)
        .map_err(|e| HalError::io_error("write_atomic_write", Some(tmp.path()), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| HalError::io_error("write_atomic_sync", Some(tmp.path()), e))?;

    match fs::metadata(path) {
        Ok(meta) => tmp
            .as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| HalError::io_error("write_atomic_permissions", Some(path), e))?,
        Err(_) => set_default_permissions(tmp.as_file())?,
    }

    tmp.persist(path)
        .map_err(|e| HalError::io_error("write_atomic_persist", Some(path), e.error))?;
    debug!(path = %path.display(), bytes = contents.len(), "file replaced");
    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(file: &fs::File) -> HalResult<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
        .map_err(|e| HalError::io_error("write_atomic_permissions", None, e))
}

#[cfg(not(unix))]
fn set_default_permissions(_file: &fs::File) -> HalResult<()> {
    Ok(())
}

/// Copy a file, returning the number of bytes copied.
pub fn copy<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> HalResult<u64> {
    let from = from.as_ref();
    let to = to.as_ref();
    fs::copy(from, to).map_err(|e| HalError::io_error("copy", Some(from), e))
}

/// Create a directory with all parent directories
pub fn create_dir_all<P: AsRef<Path>>(path: P) -> HalResult<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|e| HalError::io_error("create_dir_all", Some(path), e))
}

/// Create exactly one new directory; fails with `AlreadyExists` if present.
pub fn create_dir_new<P: AsRef<Path>>(path: P) -> HalResult<()> {
    let path = path.as_ref();
    fs::create_dir(path).map_err(|e| HalError::io_error("create_dir", Some(path), e))
}

/// Remove a file
pub fn remove_file<P: AsRef<Path>>(path: P) -> HalResult<()> {
    let path = path.as_ref();
    fs::remove_file(path).map_err(|e| HalError::io_error("remove_file", Some(path), e))
}

/// Remove a directory and all its contents
pub fn remove_dir_all<P: AsRef<Path>>(path: P) -> HalResult<()> {
    let path = path.as_ref();
    fs::remove_dir_all(path).map_err(|e| HalError::io_error("remove_dir_all", Some(path), e))
}

/// A compiled set of file-name glob patterns, e.g. `pvetheme-*.css`.
#[derive(Debug, Clone)]
pub struct FilePatterns {
    patterns: Vec<String>,
    set: GlobSet,
}

impl FilePatterns {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> HalResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern.as_ref()).map_err(|e| {
                HalError::invalid(&format!("bad file pattern '{}': {e}", pattern.as_ref()))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| HalError::invalid(&format!("cannot compile file patterns: {e}")))?;
        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set,
        })
    }

    /// Match against a bare file name (no directory part).
    pub fn matches(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Regular files in `dir` whose names match `patterns`, sorted by name.
/// A missing directory is treated as empty.
pub fn list_matching<P: AsRef<Path>>(dir: P, patterns: &FilePatterns) -> HalResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HalError::io_error("read_dir", Some(dir), e)),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HalError::io_error("read_dir_entry", Some(dir), e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| HalError::io_error("file_type", Some(&entry.path()), e))?;
        if !file_type.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if patterns.matches(name) {
                found.push(entry.path());
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Names of the immediate subdirectories of `dir`. A missing directory is
/// treated as empty; names that are not valid UTF-8 are skipped.
pub fn list_subdirs<P: AsRef<Path>>(dir: P) -> HalResult<Vec<String>> {
    let dir = dir.as_ref();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HalError::io_error("read_dir", Some(dir), e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HalError::io_error("read_dir_entry", Some(dir), e))?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_optional_missing_is_none() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let got = read_optional(dir.path().join("absent")).expect("read_optional");
        assert!(got.is_none());
    }

    #[test]
    fn write_atomic_replaces_content() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let target = dir.path().join("index.html.tpl");
        fs::write(&target, b"old").unwrap();

        write_atomic(&target, b"new content").expect("write_atomic");
        assert_eq!(fs::read(&target).unwrap(), b"new content");

        // no temp files left behind
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("t.css");
        fs::write(&target, b"a").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&target, b"b").unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn create_dir_new_reports_existing() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("20250101-000000");
        create_dir_new(&sub).expect("first create");
        let err = create_dir_new(&sub).expect_err("second create must fail");
        assert!(err.is_already_exists());
    }

    #[test]
    fn list_matching_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["pvetheme-b.css", "pvetheme-a.css", "ext-all.css", "custom-theme.css"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("pvetheme-dir.css")).unwrap();

        let patterns = FilePatterns::new(&["pvetheme-*.css", "custom-theme*.css"]).unwrap();
        let names: Vec<String> = list_matching(dir.path(), &patterns)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["custom-theme.css", "pvetheme-a.css", "pvetheme-b.css"]);
    }

    #[test]
    fn list_matching_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let patterns = FilePatterns::new(&["*.css"]).unwrap();
        assert!(list_matching(dir.path().join("nope"), &patterns).unwrap().is_empty());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(FilePatterns::new(&["[unclosed"]).is_err());
    }

    #[test]
    fn list_subdirs_ignores_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("one")).unwrap();
        fs::write(dir.path().join("two"), b"").unwrap();
        assert_eq!(list_subdirs(dir.path()).unwrap(), vec!["one".to_string()]);
    }
}
