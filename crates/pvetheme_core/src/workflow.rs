//! Install and uninstall sequences
//!
//! Install order: probe, resolve theme, snapshot, patch template, write
//! active theme, restart. Any error before the restart returns early, so a
//! template that cannot be patched never triggers a restart.

use serde::Serialize;
use tracing::{info, instrument};

use crate::applier::{apply_theme, AppliedTheme};
use crate::catalog::ThemeCatalog;
use crate::clock::Clock;
use crate::config::ThemerConfig;
use crate::error::ThemeResult;
use crate::probe::{probe, Readiness};
use crate::restore::{sweep_theme_files, SweepReport};
use crate::service::{RestartStatus, ServiceNotifier};
use crate::snapshot::{BackupStore, SnapshotId, SnapshotReport};
use crate::template::{patch_file, unpatch_file, PatchStatus, UnpatchStatus};

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub snapshot: SnapshotReport,
    pub patch: PatchStatus,
    pub theme: AppliedTheme,
    pub restart: RestartStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct UninstallReport {
    pub snapshot: Option<SnapshotReport>,
    pub unpatch: UnpatchStatus,
    pub sweep: SweepReport,
    pub restart: RestartStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub readiness: Readiness,
    /// Catalog theme whose bytes equal the active file
    pub active_theme: Option<String>,
    /// Active file exists but matches no catalog theme
    pub active_theme_unrecognized: bool,
    pub snapshot_count: usize,
    pub latest_snapshot: Option<SnapshotId>,
    pub catalog_size: Option<usize>,
}

#[instrument(skip_all, fields(theme = theme_name))]
pub fn install<C: Clock>(
    config: &ThemerConfig,
    catalog: &ThemeCatalog,
    store: &BackupStore<'_, C>,
    notifier: &dyn ServiceNotifier,
    theme_name: &str,
) -> ThemeResult<InstallReport> {
    probe(config).require_ready()?;
    catalog.resolve(theme_name)?;

    let snapshot = store.create_snapshot()?;
    let patch = patch_file(&config.template_path(), &config.stylesheet_href)?;
    let theme = apply_theme(theme_name, catalog, &config.active_theme_path())?;
    let restart = notifier.restart();

    info!(snapshot = %snapshot.id, ?patch, "install finished");
    Ok(InstallReport {
        snapshot,
        patch,
        theme,
        restart,
    })
}

#[instrument(skip_all)]
pub fn uninstall<C: Clock>(
    config: &ThemerConfig,
    store: &BackupStore<'_, C>,
    notifier: &dyn ServiceNotifier,
    take_snapshot: bool,
) -> ThemeResult<UninstallReport> {
    probe(config).require_ready()?;

    let snapshot = if take_snapshot {
        Some(store.create_snapshot()?)
    } else {
        None
    };
    let unpatch = unpatch_file(&config.template_path())?;
    let sweep = sweep_theme_files(config)?;
    let restart = notifier.restart();

    info!(?unpatch, removed = sweep.removed.len(), "uninstall finished");
    Ok(UninstallReport {
        snapshot,
        unpatch,
        sweep,
        restart,
    })
}

pub fn status<C: Clock>(
    config: &ThemerConfig,
    store: &BackupStore<'_, C>,
    catalog: Option<&ThemeCatalog>,
) -> ThemeResult<StatusReport> {
    let readiness = probe(config);
    let snapshots: Vec<SnapshotId> = store.list_snapshots()?.collect();

    let active = pvetheme_hal::fs::read_optional(config.active_theme_path())?;
    let active_theme = match (&active, catalog) {
        (Some(bytes), Some(catalog)) => catalog.find_by_content(bytes).map(|e| e.name.clone()),
        _ => None,
    };
    let active_theme_unrecognized = active.is_some() && catalog.is_some() && active_theme.is_none();

    Ok(StatusReport {
        readiness,
        active_theme,
        active_theme_unrecognized,
        snapshot_count: snapshots.len(),
        latest_snapshot: snapshots.into_iter().next(),
        catalog_size: catalog.map(ThemeCatalog::len),
    })
}
