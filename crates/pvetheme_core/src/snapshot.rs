//! Backup store
//!
//! Each snapshot is a directory under `backups_root` named by its id:
//!
//! ```text
//! <backups_root>/20250301-142233/
//!     index.html.tpl      copy of the live template (absent if there was none)
//!     themes/             copies of every theme stylesheet found
//!     metadata.json       SnapshotMetadata
//! ```
//!
//! Ids are UTC timestamps with second resolution, so lexical order is
//! creation order. Snapshots are never modified after creation and only
//! removed by an explicit `delete`/`prune`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use pvetheme_hal::fs as hal_fs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ThemerConfig;
use crate::error::{ThemeError, ThemeResult};

pub const SNAPSHOT_ID_FORMAT: &str = "%Y%m%d-%H%M%S";
pub const METADATA_FILE: &str = "metadata.json";
pub const THEMES_DIR: &str = "themes";

/// Timestamp-derived, sortable snapshot identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn from_time(at: DateTime<Utc>) -> Self {
        Self(at.format(SNAPSHOT_ID_FORMAT).to_string())
    }

    pub fn parse(raw: &str) -> ThemeResult<Self> {
        let parsed = NaiveDateTime::parse_from_str(raw, SNAPSHOT_ID_FORMAT)
            .map_err(|_| ThemeError::InvalidSnapshotId(raw.to_string()))?;
        // Reject forms chrono accepts but we never produce (e.g. unpadded fields).
        if parsed.format(SNAPSHOT_ID_FORMAT).to_string() != raw {
            return Err(ThemeError::InvalidSnapshotId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SnapshotId {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SnapshotId {
    type Error = ThemeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SnapshotId> for String {
    fn from(id: SnapshotId) -> Self {
        id.0
    }
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub template_copied: bool,
    #[serde(default)]
    pub template_bytes: u64,
    #[serde(default)]
    pub theme_files: Vec<String>,
    /// Files successfully copied, template included
    pub file_count: usize,
    #[serde(default)]
    pub failed_count: usize,
    pub success: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub tool_version: String,
}

/// Outcome of `create_snapshot`
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub id: SnapshotId,
    pub path: PathBuf,
    pub template_copied: bool,
    pub copied: usize,
    pub failed: usize,
    pub warnings: Vec<String>,
}

/// Outcome of `prune`
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub kept: Vec<SnapshotId>,
    pub removed: Vec<SnapshotId>,
    pub failed: Vec<SnapshotId>,
}

/// Newest-first sequence of snapshot ids.
///
/// Produced by a fresh directory scan; call [`list_snapshots`] again to see
/// snapshots created since.
#[derive(Debug)]
pub struct SnapshotIter {
    inner: std::vec::IntoIter<SnapshotId>,
}

impl Iterator for SnapshotIter {
    type Item = SnapshotId;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for SnapshotIter {}

/// Scan `backups_root` and return snapshot ids newest first.
/// Entries whose names are not snapshot ids are ignored; a missing
/// `backups_root` is an empty list.
pub fn list_snapshots(backups_root: &Path) -> ThemeResult<SnapshotIter> {
    let mut ids: Vec<SnapshotId> = hal_fs::list_subdirs(backups_root)?
        .iter()
        .filter_map(|name| SnapshotId::parse(name).ok())
        .collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));
    Ok(SnapshotIter {
        inner: ids.into_iter(),
    })
}

pub struct BackupStore<'a, C: Clock = SystemClock> {
    config: &'a ThemerConfig,
    clock: C,
}

impl<'a> BackupStore<'a, SystemClock> {
    pub fn new(config: &'a ThemerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<'a, C: Clock> BackupStore<'a, C> {
    pub fn with_clock(config: &'a ThemerConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn snapshot_dir(&self, id: &SnapshotId) -> PathBuf {
        self.config.backups_root.join(id.as_str())
    }

    /// Snapshot the template and every theme stylesheet.
    ///
    /// Fails with `SnapshotConflict` when a snapshot with the same id
    /// (same second) exists. Individual copy failures and a missing template
    /// are recorded in the report instead of failing the call.
    pub fn create_snapshot(&self) -> ThemeResult<SnapshotReport> {
        let created_at = self.clock.now();
        let id = SnapshotId::from_time(created_at);
        let dir = self.snapshot_dir(&id);

        hal_fs::create_dir_all(&self.config.backups_root)?;
        hal_fs::create_dir_new(&dir).map_err(|e| {
            if e.is_already_exists() {
                ThemeError::SnapshotConflict(id.to_string())
            } else {
                e.into()
            }
        })?;

        // A directory without metadata would block a retry in the same second.
        match self.fill_snapshot(id, dir.clone(), created_at) {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(snapshot = %dir.display(), error = %e, "discarding incomplete snapshot");
                if let Err(cleanup) = hal_fs::remove_dir_all(&dir) {
                    warn!(error = %cleanup, "failed to remove incomplete snapshot");
                }
                Err(e)
            }
        }
    }

    fn fill_snapshot(
        &self,
        id: SnapshotId,
        dir: PathBuf,
        created_at: DateTime<Utc>,
    ) -> ThemeResult<SnapshotReport> {
        hal_fs::create_dir_new(dir.join(THEMES_DIR))?;

        let mut copied = 0usize;
        let mut failed = 0usize;
        let mut warnings = Vec::new();

        let template = self.config.template_path();
        let template_bytes = match hal_fs::copy(&template, dir.join(&self.config.template_name)) {
            Ok(bytes) => {
                copied += 1;
                Some(bytes)
            }
            Err(e) if e.is_not_found() => {
                let msg = format!(
                    "template {} not found; snapshot holds no template",
                    template.display()
                );
                warn!("{msg}");
                warnings.push(msg);
                None
            }
            Err(e) => {
                failed += 1;
                warn!(error = %e, "template copy failed");
                warnings.push(format!("template copy failed: {e}"));
                None
            }
        };

        let mut theme_files = Vec::new();
        let patterns = self.config.theme_patterns()?;
        match hal_fs::list_matching(self.config.serving_dir_path(), &patterns) {
            Ok(paths) => {
                for path in paths {
                    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned())
                    else {
                        continue;
                    };
                    match hal_fs::copy(&path, dir.join(THEMES_DIR).join(&name)) {
                        Ok(_) => {
                            copied += 1;
                            theme_files.push(name);
                        }
                        Err(e) => {
                            failed += 1;
                            warn!(file = %name, error = %e, "theme file copy failed");
                            warnings.push(format!("{name}: {e}"));
                        }
                    }
                }
            }
            Err(e) => {
                failed += 1;
                warnings.push(format!("cannot list theme files: {e}"));
            }
        }

        let metadata = SnapshotMetadata {
            id: id.clone(),
            created_at,
            template_copied: template_bytes.is_some(),
            template_bytes: template_bytes.unwrap_or(0),
            theme_files,
            file_count: copied,
            failed_count: failed,
            success: failed == 0,
            warnings: warnings.clone(),
            tool_version: crate::VERSION.to_string(),
        };
        let json = serde_json::to_vec_pretty(&metadata)?;
        hal_fs::write_atomic(dir.join(METADATA_FILE), &json)?;

        info!(snapshot = %id, copied, failed, "snapshot created");
        Ok(SnapshotReport {
            id,
            path: dir,
            template_copied: metadata.template_copied,
            copied,
            failed,
            warnings,
        })
    }

    pub fn list_snapshots(&self) -> ThemeResult<SnapshotIter> {
        list_snapshots(&self.config.backups_root)
    }

    pub fn latest(&self) -> ThemeResult<Option<SnapshotId>> {
        Ok(self.list_snapshots()?.next())
    }

    /// Parse `raw` and check that the snapshot exists.
    pub fn resolve(&self, raw: &str) -> ThemeResult<SnapshotId> {
        let id = SnapshotId::parse(raw).map_err(|_| ThemeError::SnapshotNotFound(raw.to_string()))?;
        if self.snapshot_dir(&id).is_dir() {
            Ok(id)
        } else {
            Err(ThemeError::SnapshotNotFound(raw.to_string()))
        }
    }

    pub fn read_metadata(&self, id: &SnapshotId) -> ThemeResult<SnapshotMetadata> {
        read_metadata(&self.snapshot_dir(id))
    }

    /// Delete one snapshot. Only ever called on explicit user request.
    pub fn delete(&self, id: &SnapshotId) -> ThemeResult<()> {
        let dir = self.snapshot_dir(id);
        if !dir.is_dir() {
            return Err(ThemeError::SnapshotNotFound(id.to_string()));
        }
        hal_fs::remove_dir_all(&dir)?;
        info!(snapshot = %id, "snapshot deleted");
        Ok(())
    }

    /// Keep the newest `keep` snapshots and delete the rest.
    pub fn prune(&self, keep: usize) -> ThemeResult<PruneReport> {
        let mut report = PruneReport::default();
        for (index, id) in self.list_snapshots()?.enumerate() {
            if index < keep {
                report.kept.push(id);
                continue;
            }
            match self.delete(&id) {
                Ok(()) => report.removed.push(id),
                Err(e) => {
                    warn!(snapshot = %id, error = %e, "failed to delete snapshot");
                    report.failed.push(id);
                }
            }
        }
        debug!(kept = report.kept.len(), removed = report.removed.len(), "prune finished");
        Ok(report)
    }
}

pub(crate) fn read_metadata(snapshot_dir: &Path) -> ThemeResult<SnapshotMetadata> {
    let bytes = hal_fs::read(snapshot_dir.join(METADATA_FILE))?;
    Ok(serde_json::from_slice(&bytes)?)
}
