//! Command dispatch
//!
//! `Request` is the parsed intent, `execute` runs it against the core and
//! returns an `Outcome` for the renderer. Nothing here prints.

use serde::Serialize;
use tracing::{debug, warn};

use pvetheme_core::palette::{extract_palette, Swatch};
use pvetheme_core::{
    install, load_catalog, notifier_from_config, status, uninstall, BackupStore, InstallReport,
    PruneReport, RestartStatus, RestoreEngine, RestoreOptions, RestoreReport, SnapshotId, SnapshotMetadata,
    SnapshotReport, StatusReport, ThemeCatalog, ThemeError, ThemeOrigin, ThemeResult,
    ThemeSummary, ThemerConfig, UninstallReport,
};

use crate::cli::{Cli, Commands};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// No subcommand and no flags
    Overview,
    List,
    Install { theme: String },
    Restore { snapshot: Option<String>, reinstate_themes: bool },
    Status,
    Backup,
    Preview { theme: String },
    Uninstall { snapshot: bool },
    Snapshots,
    Prune { keep: usize },
    ShowConfig,
}

impl Request {
    pub fn from_cli(cli: &Cli) -> ThemeResult<Self> {
        let mode_flags = cli.auto || cli.theme.is_some() || cli.backup_only;
        if let Some(command) = &cli.command {
            if mode_flags {
                return Err(ThemeError::InvalidSelection(
                    "--auto, --theme and --backup-only cannot be combined with a subcommand"
                        .to_string(),
                ));
            }
            return Ok(Self::from_command(command));
        }

        if cli.backup_only {
            return Ok(Request::Backup);
        }
        match (cli.auto, &cli.theme) {
            (true, Some(theme)) => Ok(Request::Install {
                theme: theme.clone(),
            }),
            (true, None) => Err(ThemeError::InvalidSelection(
                "--auto needs --theme <NAME>".to_string(),
            )),
            (false, Some(_)) => Err(ThemeError::InvalidSelection(
                "--theme is only used together with --auto".to_string(),
            )),
            (false, None) => Ok(Request::Overview),
        }
    }

    fn from_command(command: &Commands) -> Self {
        match command {
            Commands::List => Request::List,
            Commands::Install { theme } => Request::Install {
                theme: theme.clone(),
            },
            Commands::Restore {
                snapshot,
                reinstate_themes,
            } => Request::Restore {
                snapshot: snapshot.clone(),
                reinstate_themes: *reinstate_themes,
            },
            Commands::Status => Request::Status,
            Commands::Backup => Request::Backup,
            Commands::Preview { theme } => Request::Preview {
                theme: theme.clone(),
            },
            Commands::Uninstall { no_backup } => Request::Uninstall {
                snapshot: !no_backup,
            },
            Commands::Snapshots => Request::Snapshots,
            Commands::Prune { keep } => Request::Prune { keep: *keep },
            Commands::Config => Request::ShowConfig,
        }
    }

    /// Name used in privilege errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Request::Overview => "overview",
            Request::List => "list",
            Request::Install { .. } => "install",
            Request::Restore { .. } => "restore",
            Request::Status => "status",
            Request::Backup => "backup",
            Request::Preview { .. } => "preview",
            Request::Uninstall { .. } => "uninstall",
            Request::Snapshots => "snapshots",
            Request::Prune { .. } => "prune",
            Request::ShowConfig => "config",
        }
    }

    /// Writes to the install root or the snapshot store
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Request::Install { .. }
                | Request::Restore { .. }
                | Request::Backup
                | Request::Uninstall { .. }
                | Request::Prune { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub name: String,
    pub label: String,
    pub size: usize,
    pub origin: ThemeOrigin,
    pub palette: Vec<Swatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotListing {
    pub id: SnapshotId,
    pub metadata: Option<SnapshotMetadata>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", content = "result", rename_all = "snake_case")]
pub enum Outcome {
    Overview {
        status: StatusReport,
        themes: Vec<ThemeSummary>,
    },
    List(Vec<ThemeSummary>),
    Install(InstallReport),
    Restore {
        #[serde(flatten)]
        report: RestoreReport,
        restart: RestartStatus,
    },
    Status(StatusReport),
    Backup(SnapshotReport),
    Preview(PreviewReport),
    Uninstall(UninstallReport),
    Snapshots(Vec<SnapshotListing>),
    Prune(PruneReport),
    Config(String),
}

impl Outcome {
    /// Non-fatal problems the summary should call out
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        match self {
            Outcome::Install(report) => {
                out.extend(report.snapshot.warnings.iter().cloned());
                if let RestartStatus::Failed { message } = &report.restart {
                    out.push(format!("restart failed, restart the proxy by hand: {message}"));
                }
            }
            Outcome::Restore { report, restart } => {
                out.extend(report.warnings.iter().cloned());
                if !report.is_complete() {
                    out.push(format!("{} file(s) could not be processed", report.failed));
                }
                if let RestartStatus::Failed { message } = restart {
                    out.push(format!("restart failed, restart the proxy by hand: {message}"));
                }
            }
            Outcome::Backup(report) => {
                out.extend(report.warnings.iter().cloned());
            }
            Outcome::Uninstall(report) => {
                if !report.sweep.failed.is_empty() {
                    out.push(format!("could not remove: {}", report.sweep.failed.join(", ")));
                }
                if let RestartStatus::Failed { message } = &report.restart {
                    out.push(format!("restart failed, restart the proxy by hand: {message}"));
                }
            }
            Outcome::Prune(report) => {
                for id in &report.failed {
                    out.push(format!("could not delete snapshot {id}"));
                }
            }
            Outcome::Overview { status, .. } | Outcome::Status(status) => {
                if status.readiness.is_degraded() {
                    out.push("console not ready; only restore is available".to_string());
                }
            }
            _ => {}
        }
        out
    }
}

pub struct Context {
    pub config: ThemerConfig,
    pub no_restart: bool,
}

pub fn execute(request: &Request, ctx: &Context) -> ThemeResult<Outcome> {
    let config = &ctx.config;
    if request.mutates() && config.require_root {
        pvetheme_hal::require_elevated(request.name())?;
    }
    debug!(request = request.name(), "executing");

    let store = BackupStore::new(config);
    match request {
        Request::Overview => {
            let catalog = catalog_for_status(config);
            Ok(Outcome::Overview {
                status: status(config, &store, catalog.as_ref())?,
                themes: catalog.map(|c| c.summaries()).unwrap_or_default(),
            })
        }
        Request::List => Ok(Outcome::List(load_catalog(&config.catalog)?.summaries())),
        Request::Install { theme } => {
            let catalog = load_catalog(&config.catalog)?;
            let notifier = notifier_from_config(&config.service, ctx.no_restart);
            Ok(Outcome::Install(install(config, &catalog, &store, notifier.as_ref(), theme)?))
        }
        Request::Restore {
            snapshot,
            reinstate_themes,
        } => {
            let engine = RestoreEngine::new(config, &store).with_options(RestoreOptions {
                reinstate_theme_files: *reinstate_themes,
            });
            let report = match snapshot {
                Some(raw) => engine.restore(&store.resolve(raw)?)?,
                None => engine.restore_latest()?,
            };
            let restart = notifier_from_config(&config.service, ctx.no_restart).restart();
            Ok(Outcome::Restore { report, restart })
        }
        Request::Status => {
            let catalog = catalog_for_status(config);
            Ok(Outcome::Status(status(config, &store, catalog.as_ref())?))
        }
        Request::Backup => {
            pvetheme_core::probe(config).require_root_dir()?;
            Ok(Outcome::Backup(store.create_snapshot()?))
        }
        Request::Preview { theme } => {
            let catalog = load_catalog(&config.catalog)?;
            let entry = catalog.resolve(theme)?;
            Ok(Outcome::Preview(PreviewReport {
                name: entry.name.clone(),
                label: entry.label.clone(),
                size: entry.size(),
                origin: entry.origin.clone(),
                palette: extract_palette(&entry.content_str()),
            }))
        }
        Request::Uninstall { snapshot } => {
            let notifier = notifier_from_config(&config.service, ctx.no_restart);
            Ok(Outcome::Uninstall(uninstall(config, &store, notifier.as_ref(), *snapshot)?))
        }
        Request::Snapshots => {
            let listings = store
                .list_snapshots()?
                .map(|id| {
                    let metadata = store.read_metadata(&id).ok();
                    SnapshotListing { id, metadata }
                })
                .collect();
            Ok(Outcome::Snapshots(listings))
        }
        Request::Prune { keep } => Ok(Outcome::Prune(store.prune(*keep)?)),
        Request::ShowConfig => Ok(Outcome::Config(config.to_toml()?)),
    }
}

/// Status still renders when the catalog cannot be loaded.
fn catalog_for_status(config: &ThemerConfig) -> Option<ThemeCatalog> {
    match load_catalog(&config.catalog) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            warn!(error = %e, "theme catalog unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pvetheme_core::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn request(args: &[&str]) -> ThemeResult<Request> {
        let mut argv = vec!["pvetheme"];
        argv.extend_from_slice(args);
        Request::from_cli(&Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn flags_map_to_requests() {
        assert_eq!(request(&[]).unwrap(), Request::Overview);
        assert_eq!(
            request(&["--auto", "--theme", "ocean-blue"]).unwrap(),
            Request::Install {
                theme: "ocean-blue".to_string()
            }
        );
        assert_eq!(request(&["--backup-only"]).unwrap(), Request::Backup);
        assert_eq!(
            request(&["uninstall", "--no-backup"]).unwrap(),
            Request::Uninstall { snapshot: false }
        );
    }

    #[test]
    fn invalid_selections() {
        let cases: [&[&str]; 3] = [&["--auto"], &["--theme", "x"], &["--auto", "--theme", "x", "status"]];
        for args in cases {
            let err = request(args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PreconditionFailure, "{args:?}");
        }
    }

    #[test]
    fn mutating_requests() {
        assert!(Request::Backup.mutates());
        assert!(Request::Prune { keep: 1 }.mutates());
        assert!(!Request::Status.mutates());
        assert!(!Request::Preview { theme: "x".into() }.mutates());
    }

    fn context(tmp: &TempDir) -> Context {
        let config = ThemerConfig::rooted_at(tmp.path());
        fs::create_dir_all(config.serving_dir_path()).unwrap();
        fs::write(config.template_path(), "<html><head></head></html>").unwrap();
        let themes = tmp.path().join("themes");
        fs::create_dir_all(&themes).unwrap();
        fs::write(themes.join("ocean-blue.css"), ":root{--bg:#003366;--fg:#ffffff}").unwrap();
        Context {
            config,
            no_restart: true,
        }
    }

    #[test]
    fn preview_extracts_palette() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        let outcome = execute(
            &Request::Preview {
                theme: "ocean-blue".into(),
            },
            &ctx,
        )
        .unwrap();
        let Outcome::Preview(preview) = outcome else {
            panic!("unexpected outcome");
        };
        assert_eq!(preview.label, "Ocean Blue");
        assert_eq!(preview.palette.len(), 2);
    }

    #[test]
    fn install_then_restore() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        let outcome = execute(
            &Request::Install {
                theme: "ocean-blue".into(),
            },
            &ctx,
        )
        .unwrap();
        assert!(outcome.warnings().is_empty());
        assert!(ctx.config.active_theme_path().exists());

        let outcome = execute(
            &Request::Restore {
                snapshot: None,
                reinstate_themes: false,
            },
            &ctx,
        )
        .unwrap();
        let Outcome::Restore { report, restart } = outcome else {
            panic!("unexpected outcome");
        };
        assert!(report.template_restored);
        assert_eq!(restart, RestartStatus::Skipped);
        assert_eq!(
            fs::read_to_string(ctx.config.template_path()).unwrap(),
            "<html><head></head></html>"
        );
    }

    #[test]
    fn backup_requires_install_root() {
        let tmp = TempDir::new().unwrap();
        let ctx = Context {
            config: ThemerConfig::rooted_at(tmp.path()),
            no_restart: true,
        };
        let err = execute(&Request::Backup, &ctx).unwrap_err();
        assert!(matches!(err, ThemeError::RootMissing(_)));
    }

    #[test]
    fn restore_requires_install_root() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        execute(&Request::Backup, &ctx).unwrap();
        fs::remove_dir_all(&ctx.config.install_root).unwrap();

        let err = execute(
            &Request::Restore {
                snapshot: None,
                reinstate_themes: false,
            },
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, ThemeError::RootMissing(_)));
        assert!(!ctx.config.install_root.exists());
    }

    #[test]
    fn status_survives_missing_catalog() {
        let tmp = TempDir::new().unwrap();
        let ctx = Context {
            config: ThemerConfig::rooted_at(tmp.path()),
            no_restart: true,
        };
        let outcome = execute(&Request::Status, &ctx).unwrap();
        assert_eq!(outcome.warnings().len(), 1);
    }
}
