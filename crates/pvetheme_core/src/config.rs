//! Configuration management for pvetheme
//!
//! All filesystem locations the tool touches come from `ThemerConfig`; nothing
//! reads a hard-coded path at operation time. The config is read from TOML
//! (`/etc/pvetheme/config.toml` unless `--config` says otherwise) and then
//! selectively overridden by command-line flags.

use std::path::{Path, PathBuf};

use pvetheme_hal::{fs as hal_fs, FilePatterns};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ThemeError, ThemeResult};

/// Location of the system-wide config file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pvetheme/config.toml";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemerConfig {
    /// Console installation directory (holds the template)
    pub install_root: PathBuf,

    /// Template file name inside `install_root`
    pub template_name: String,

    /// Directory the stylesheets are served from, relative to `install_root`
    pub serving_dir: PathBuf,

    /// File name of the active theme inside `serving_dir`
    pub active_theme_file: String,

    /// Globs identifying theme stylesheets in `serving_dir`, including
    /// names left behind by older installers
    pub theme_file_patterns: Vec<String>,

    /// URL the injected `<link>` points at
    pub stylesheet_href: String,

    /// Directory holding one subdirectory per snapshot
    pub backups_root: PathBuf,

    /// Refuse mutating commands unless running as root
    pub require_root: bool,

    pub catalog: CatalogConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

impl Default for ThemerConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("/usr/share/pve-manager"),
            template_name: "index.html.tpl".to_string(),
            serving_dir: PathBuf::from("css"),
            active_theme_file: "pvetheme-active.css".to_string(),
            theme_file_patterns: vec![
                "pvetheme-*.css".to_string(),
                "custom-theme*.css".to_string(),
                "pve-theme-*.css".to_string(),
            ],
            stylesheet_href: "/pve2/css/pvetheme-active.css".to_string(),
            backups_root: PathBuf::from("/var/lib/pvetheme/backups"),
            require_root: true,
            catalog: CatalogConfig::default(),
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where the theme catalog comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CatalogConfig {
    /// A directory of `*.css` files
    Local { dir: PathBuf },
    /// An HTTP(S) base URL serving `index.json` and the stylesheets
    Remote { url: String },
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig::Local {
            dir: PathBuf::from("/usr/share/pvetheme/themes"),
        }
    }
}

/// Console proxy restart settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Set to false to never restart (the operator restarts by hand)
    pub enabled: bool,
    /// Program and arguments
    pub restart_command: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            restart_command: vec![
                "systemctl".to_string(),
                "restart".to_string(),
                "pveproxy".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl ThemerConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ThemeResult<Self> {
        let path = path.as_ref();
        let bytes = hal_fs::read(path).map_err(|e| {
            ThemeError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        let content = String::from_utf8(bytes).map_err(|_| {
            ThemeError::Config(format!("config file {} is not valid UTF-8", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            ThemeError::Config(format!("failed to parse config file {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `explicit` if given (it must exist), otherwise the system-wide
    /// file when present, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> ThemeResult<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    Self::load_from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Serialize to TOML (`pvetheme config`)
    pub fn to_toml(&self) -> ThemeResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ThemeError::Config(format!("failed to serialize config: {e}")))
    }

    pub fn validate(&self) -> ThemeResult<()> {
        if self.template_name.is_empty() || self.template_name.contains('/') {
            return Err(ThemeError::Config(format!(
                "template_name must be a bare file name, got '{}'",
                self.template_name
            )));
        }
        if self.serving_dir.is_absolute() {
            return Err(ThemeError::Config(
                "serving_dir must be relative to install_root".to_string(),
            ));
        }
        if self.active_theme_file.is_empty() || self.active_theme_file.contains('/') {
            return Err(ThemeError::Config(format!(
                "active_theme_file must be a bare file name, got '{}'",
                self.active_theme_file
            )));
        }
        if self.stylesheet_href.is_empty()
            || self.stylesheet_href.contains(|c: char| c == '"' || c == '<' || c == '>')
        {
            return Err(ThemeError::Config(format!(
                "stylesheet_href is not a usable URL: '{}'",
                self.stylesheet_href
            )));
        }
        if self.service.enabled && self.service.restart_command.is_empty() {
            return Err(ThemeError::Config(
                "service.restart_command must not be empty while the service is enabled".to_string(),
            ));
        }
        // Restore removes files by pattern; an active file outside the
        // patterns would survive a restore.
        let patterns = self.theme_patterns()?;
        if !patterns.matches(&self.active_theme_file) {
            return Err(ThemeError::Config(format!(
                "active_theme_file '{}' does not match any theme_file_patterns",
                self.active_theme_file
            )));
        }
        Ok(())
    }

    pub fn template_path(&self) -> PathBuf {
        self.install_root.join(&self.template_name)
    }

    pub fn serving_dir_path(&self) -> PathBuf {
        self.install_root.join(&self.serving_dir)
    }

    pub fn active_theme_path(&self) -> PathBuf {
        self.serving_dir_path().join(&self.active_theme_file)
    }

    pub fn theme_patterns(&self) -> ThemeResult<FilePatterns> {
        if self.theme_file_patterns.is_empty() {
            return Err(ThemeError::Config("theme_file_patterns must not be empty".to_string()));
        }
        FilePatterns::new(&self.theme_file_patterns)
            .map_err(|e| ThemeError::Config(e.to_string()))
    }

    /// Test/fixture helper: every path rooted under `base`.
    pub fn rooted_at<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref();
        Self {
            install_root: base.join("pve-manager"),
            backups_root: base.join("backups"),
            require_root: false,
            catalog: CatalogConfig::Local {
                dir: base.join("themes"),
            },
            service: ServiceConfig {
                enabled: true,
                restart_command: vec!["true".to_string()],
            },
            ..Self::default()
        }
    }
}
