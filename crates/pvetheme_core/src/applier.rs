//! Theme applier
//!
//! Writes one catalog stylesheet to the active-theme path. The template is
//! not touched here; the install workflow patches it separately.

use std::path::{Path, PathBuf};

use pvetheme_hal::fs as hal_fs;
use serde::Serialize;
use tracing::info;

use crate::catalog::ThemeCatalog;
use crate::error::ThemeResult;

#[derive(Debug, Clone, Serialize)]
pub struct AppliedTheme {
    pub name: String,
    pub label: String,
    pub path: PathBuf,
    pub bytes: usize,
    /// An earlier active theme was replaced
    pub replaced: bool,
}

/// Resolve `theme_name` (exact match) and overwrite `active_path` with its
/// bytes. An unknown name fails with `ThemeNotFound` before anything is
/// written.
pub fn apply_theme(theme_name: &str, catalog: &ThemeCatalog, active_path: &Path) -> ThemeResult<AppliedTheme> {
    let entry = catalog.resolve(theme_name)?;

    if let Some(parent) = active_path.parent() {
        hal_fs::create_dir_all(parent)?;
    }
    let replaced = active_path.is_file();
    hal_fs::write_atomic(active_path, &entry.content)?;

    info!(theme = %entry.name, path = %active_path.display(), replaced, "theme applied");
    Ok(AppliedTheme {
        name: entry.name.clone(),
        label: entry.label.clone(),
        path: active_path.to_path_buf(),
        bytes: entry.size(),
        replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ThemeEntry, ThemeOrigin};
    use crate::error::ThemeError;
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> ThemeCatalog {
        let origin = ThemeOrigin::Local(PathBuf::from("/themes"));
        ThemeCatalog::from_entries(vec![
            ThemeEntry::new("ocean-blue", b":root{--bg:#003366}".to_vec(), origin.clone()).unwrap(),
            ThemeEntry::new("zen", b"body{}".to_vec(), origin).unwrap(),
        ])
    }

    #[test]
    fn overwrites_previous_theme() {
        let tmp = TempDir::new().unwrap();
        let active = tmp.path().join("css").join("pvetheme-active.css");

        let first = apply_theme("zen", &catalog(), &active).unwrap();
        assert!(!first.replaced);
        let second = apply_theme("ocean-blue", &catalog(), &active).unwrap();
        assert!(second.replaced);
        assert_eq!(fs::read(&active).unwrap(), b":root{--bg:#003366}");
    }

    #[test]
    fn unknown_theme_leaves_file_alone() {
        let tmp = TempDir::new().unwrap();
        let active = tmp.path().join("pvetheme-active.css");
        fs::write(&active, b"previous").unwrap();

        let err = apply_theme("foo", &catalog(), &active).unwrap_err();
        assert!(matches!(err, ThemeError::ThemeNotFound(name) if name == "foo"));
        assert_eq!(fs::read(&active).unwrap(), b"previous");
    }
}
