use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use pvetheme_core::{CatalogConfig, ThemerConfig};

/// Install, preview and roll back Proxmox VE web console themes.
#[derive(Parser, Debug)]
#[command(name = "pvetheme", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Install the theme given with --theme without prompting
    #[arg(long)]
    pub auto: bool,

    /// Theme to install in --auto mode
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Only take a snapshot
    #[arg(long, conflicts_with_all = ["auto", "theme"])]
    pub backup_only: bool,

    /// Configuration file (default: /etc/pvetheme/config.toml if present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Console installation directory
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Snapshot directory
    #[arg(long, global = true, value_name = "DIR")]
    pub backups: Option<PathBuf>,

    /// Local theme catalog directory
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "catalog_url")]
    pub themes: Option<PathBuf>,

    /// Remote theme catalog base URL
    #[arg(long, global = true, value_name = "URL")]
    pub catalog_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Do not restart the console proxy
    #[arg(long, global = true)]
    pub no_restart: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List catalog themes
    List,
    /// Snapshot, patch the template and activate a theme
    Install {
        theme: String,
    },
    /// Restore a snapshot (newest when no id is given)
    Restore {
        snapshot: Option<String>,
        /// Copy the snapshot's theme files back after clearing
        #[arg(long)]
        reinstate_themes: bool,
    },
    /// Show host readiness, active theme and snapshots
    Status,
    /// Take a snapshot of the template and theme files
    Backup,
    /// Show a theme's details and palette
    Preview {
        theme: String,
    },
    /// Remove the loader block and theme files without a snapshot
    Uninstall {
        /// Skip the safety snapshot
        #[arg(long)]
        no_backup: bool,
    },
    /// List snapshots with their metadata
    Snapshots,
    /// Delete all but the newest snapshots
    Prune {
        #[arg(long, value_name = "N")]
        keep: usize,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    /// Apply path and catalog flags on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ThemerConfig) {
        if let Some(root) = &self.root {
            config.install_root = root.clone();
        }
        if let Some(backups) = &self.backups {
            config.backups_root = backups.clone();
        }
        if let Some(dir) = &self.themes {
            config.catalog = CatalogConfig::Local { dir: dir.clone() };
        }
        if let Some(url) = &self.catalog_url {
            config.catalog = CatalogConfig::Remote { url: url.clone() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_replace_paths() {
        let cli = Cli::try_parse_from([
            "pvetheme",
            "--root",
            "/srv/pve",
            "--themes",
            "/srv/themes",
            "status",
        ])
        .unwrap();
        let mut config = ThemerConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.install_root, PathBuf::from("/srv/pve"));
        assert_eq!(
            config.catalog,
            CatalogConfig::Local {
                dir: PathBuf::from("/srv/themes")
            }
        );
    }

    #[test]
    fn catalog_sources_conflict() {
        let parsed = Cli::try_parse_from([
            "pvetheme",
            "--themes",
            "/a",
            "--catalog-url",
            "https://b",
            "list",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pvetheme", "backup", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.command, Some(Commands::Backup));
    }
}
