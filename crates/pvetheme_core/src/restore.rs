//! Restore engine
//!
//! Puts the template back from a snapshot and clears every theme stylesheet
//! from the serving directory. Snapshots are read, never consumed.
//!
//! A missing template is tolerated; a missing install root is not, and
//! nothing under it is ever recreated.

use pvetheme_hal::fs as hal_fs;
use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::ThemerConfig;
use crate::error::{ThemeError, ThemeResult};
use crate::probe::probe;
use crate::snapshot::{self, BackupStore, SnapshotId, THEMES_DIR};

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Copy the snapshot's theme files back after the sweep
    pub reinstate_theme_files: bool,
}

/// Files removed by a theme-file sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub snapshot: SnapshotId,
    pub template_restored: bool,
    pub removed: Vec<String>,
    pub reinstated: Vec<String>,
    pub failed: usize,
    pub warnings: Vec<String>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Delete every file in the serving directory that matches the theme-file
/// patterns. Per-file failures are collected, not returned.
pub fn sweep_theme_files(config: &ThemerConfig) -> ThemeResult<SweepReport> {
    let patterns = config.theme_patterns()?;
    let mut report = SweepReport::default();
    for path in hal_fs::list_matching(config.serving_dir_path(), &patterns)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match hal_fs::remove_file(&path) {
            Ok(()) => report.removed.push(name),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to remove theme file");
                report.failed.push(name);
            }
        }
    }
    Ok(report)
}

pub struct RestoreEngine<'a, C: Clock> {
    config: &'a ThemerConfig,
    store: &'a BackupStore<'a, C>,
    options: RestoreOptions,
}

impl<'a, C: Clock> RestoreEngine<'a, C> {
    pub fn new(config: &'a ThemerConfig, store: &'a BackupStore<'a, C>) -> Self {
        Self {
            config,
            store,
            options: RestoreOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RestoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn restore(&self, id: &SnapshotId) -> ThemeResult<RestoreReport> {
        probe(self.config).require_root_dir()?;
        let dir = self.store.snapshot_dir(id);
        if !dir.is_dir() {
            return Err(ThemeError::SnapshotNotFound(id.to_string()));
        }

        let mut warnings = Vec::new();
        let mut failed = 0usize;

        let recorded = match snapshot::read_metadata(&dir) {
            Ok(meta) => Some(meta.template_copied),
            Err(e) => {
                warnings.push(format!("snapshot metadata unreadable: {e}"));
                None
            }
        };

        let saved = if recorded == Some(false) {
            None
        } else {
            hal_fs::read_optional(dir.join(&self.config.template_name))?
        };

        let template_restored = match saved {
            Some(bytes) => {
                let target = self.config.template_path();
                hal_fs::write_atomic(&target, &bytes)?;
                info!(snapshot = %id, template = %target.display(), "template restored");
                true
            }
            None => {
                let msg = format!("snapshot {id} holds no template; template left as is");
                warn!("{msg}");
                warnings.push(msg);
                false
            }
        };

        let sweep = sweep_theme_files(self.config)?;
        failed += sweep.failed.len();

        let mut reinstated = Vec::new();
        if self.options.reinstate_theme_files {
            let patterns = self.config.theme_patterns()?;
            let serving = self.config.serving_dir_path();
            for path in hal_fs::list_matching(dir.join(THEMES_DIR), &patterns)? {
                let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                    continue;
                };
                let copied = hal_fs::create_dir_all(&serving)
                    .and_then(|()| hal_fs::copy(&path, serving.join(&name)));
                match copied {
                    Ok(_) => reinstated.push(name),
                    Err(e) => {
                        failed += 1;
                        warnings.push(format!("{name}: {e}"));
                    }
                }
            }
        }

        info!(
            snapshot = %id,
            removed = sweep.removed.len(),
            reinstated = reinstated.len(),
            failed,
            "restore finished"
        );
        Ok(RestoreReport {
            snapshot: id.clone(),
            template_restored,
            removed: sweep.removed,
            reinstated,
            failed,
            warnings,
        })
    }

    /// Restore the newest snapshot.
    pub fn restore_latest(&self) -> ThemeResult<RestoreReport> {
        let id = self
            .store
            .latest()?
            .ok_or_else(|| ThemeError::NoSnapshotsFound(self.config.backups_root.clone()))?;
        self.restore(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ThemerConfig, ManualClock) {
        let tmp = TempDir::new().unwrap();
        let config = ThemerConfig::rooted_at(tmp.path());
        fs::create_dir_all(config.serving_dir_path()).unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        (tmp, config, clock)
    }

    #[test]
    fn restores_template_and_sweeps_themes() {
        let (_tmp, config, clock) = fixture();
        fs::write(config.template_path(), b"<head></head>original").unwrap();
        let store = BackupStore::with_clock(&config, &clock);
        let id = store.create_snapshot().unwrap().id;

        fs::write(config.template_path(), b"<head>patched</head>").unwrap();
        fs::write(config.active_theme_path(), b"x").unwrap();
        fs::write(config.serving_dir_path().join("custom-theme-old.css"), b"y").unwrap();
        fs::write(config.serving_dir_path().join("ext6-pve.css"), b"keep").unwrap();

        let report = RestoreEngine::new(&config, &store).restore(&id).unwrap();
        assert!(report.template_restored);
        assert!(report.is_complete());
        assert_eq!(report.removed.len(), 2);
        assert_eq!(fs::read(config.template_path()).unwrap(), b"<head></head>original");
        assert!(!config.active_theme_path().exists());
        assert!(config.serving_dir_path().join("ext6-pve.css").exists());
        assert!(store.snapshot_dir(&id).is_dir());
    }

    #[test]
    fn snapshot_without_template_only_warns() {
        let (_tmp, config, clock) = fixture();
        let store = BackupStore::with_clock(&config, &clock);
        let id = store.create_snapshot().unwrap().id;
        fs::write(config.template_path(), b"current").unwrap();

        let report = RestoreEngine::new(&config, &store).restore(&id).unwrap();
        assert!(!report.template_restored);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(fs::read(config.template_path()).unwrap(), b"current");
    }

    #[test]
    fn reinstates_theme_files_when_asked() {
        let (_tmp, config, clock) = fixture();
        fs::write(config.template_path(), b"t").unwrap();
        fs::write(config.active_theme_path(), b"saved theme").unwrap();
        let store = BackupStore::with_clock(&config, &clock);
        let id = store.create_snapshot().unwrap().id;
        fs::write(config.active_theme_path(), b"newer theme").unwrap();

        let report = RestoreEngine::new(&config, &store)
            .with_options(RestoreOptions {
                reinstate_theme_files: true,
            })
            .restore(&id)
            .unwrap();
        assert_eq!(report.reinstated, vec!["pvetheme-active.css".to_string()]);
        assert_eq!(fs::read(config.active_theme_path()).unwrap(), b"saved theme");
    }

    #[test]
    fn missing_install_root_is_not_recreated() {
        let (_tmp, config, clock) = fixture();
        fs::write(config.template_path(), b"<head></head>").unwrap();
        let store = BackupStore::with_clock(&config, &clock);
        let id = store.create_snapshot().unwrap().id;
        fs::remove_dir_all(&config.install_root).unwrap();

        let err = RestoreEngine::new(&config, &store).restore(&id).unwrap_err();
        assert!(matches!(err, ThemeError::RootMissing(_)));
        assert!(!config.install_root.exists());
        assert!(store.snapshot_dir(&id).is_dir());
    }

    #[test]
    fn template_missing_still_restores() {
        let (_tmp, config, clock) = fixture();
        fs::write(config.template_path(), b"<head></head>saved").unwrap();
        let store = BackupStore::with_clock(&config, &clock);
        let id = store.create_snapshot().unwrap().id;
        fs::remove_file(config.template_path()).unwrap();

        let report = RestoreEngine::new(&config, &store).restore(&id).unwrap();
        assert!(report.template_restored);
        assert_eq!(fs::read(config.template_path()).unwrap(), b"<head></head>saved");
    }

    #[test]
    fn unknown_and_empty() {
        let (_tmp, config, clock) = fixture();
        let store = BackupStore::with_clock(&config, &clock);
        let engine = RestoreEngine::new(&config, &store);
        assert!(matches!(
            engine.restore_latest(),
            Err(ThemeError::NoSnapshotsFound(_))
        ));
        let missing = SnapshotId::parse("20200101-000000").unwrap();
        assert!(matches!(engine.restore(&missing), Err(ThemeError::SnapshotNotFound(_))));
    }
}
