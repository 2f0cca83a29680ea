//! pvetheme core
//!
//! Backup, template patching, theme application and restore for the
//! Proxmox VE web console. Every operation takes an explicit
//! [`ThemerConfig`], so the whole engine runs against a temp directory in
//! tests.
//!
//! Control flow for an install:
//!
//! ```text
//! probe -> BackupStore::create_snapshot -> template::patch_file
//!       -> applier::apply_theme -> ServiceNotifier::restart
//! ```
//!
//! [`RestoreEngine`] reverses the last two mutations from any snapshot.

pub mod applier;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod palette;
pub mod probe;
pub mod restore;
pub mod service;
pub mod snapshot;
pub mod template;
pub mod workflow;

pub use applier::{apply_theme, AppliedTheme};
pub use catalog::{load_catalog, ThemeCatalog, ThemeEntry, ThemeOrigin, ThemeSummary};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CatalogConfig, LogFormat, ThemerConfig};
pub use error::{ErrorKind, ThemeError, ThemeResult};
pub use probe::{probe, Readiness};
pub use restore::{sweep_theme_files, RestoreEngine, RestoreOptions, RestoreReport, SweepReport};
pub use service::{notifier_from_config, RestartStatus, ServiceNotifier};
pub use snapshot::{list_snapshots, BackupStore, PruneReport, SnapshotId, SnapshotMetadata, SnapshotReport};
pub use template::{PatchStatus, UnpatchStatus};
pub use workflow::{install, status, uninstall, InstallReport, StatusReport, UninstallReport};

/// Crate version, recorded in snapshot metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
