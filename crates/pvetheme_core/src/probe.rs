//! Filesystem probe
//!
//! Read-only inspection of the install root. Callers decide what a missing
//! path means: install refuses, restore carries on in degraded mode.

use std::path::PathBuf;

use pvetheme_hal::platform_detected;
use serde::Serialize;
use tracing::debug;

use crate::config::ThemerConfig;
use crate::error::{ThemeError, ThemeResult};
use crate::template;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub root: PathBuf,
    pub template: PathBuf,
    pub root_exists: bool,
    pub template_exists: bool,
    pub serving_dir_exists: bool,
    pub patched: bool,
    pub active_theme_present: bool,
}

impl Readiness {
    /// Root directory and template both present
    pub fn is_ready(&self) -> bool {
        self.root_exists && self.template_exists
    }

    /// Only restore makes sense
    pub fn is_degraded(&self) -> bool {
        !self.is_ready()
    }

    /// Turn a not-ready probe into the matching precondition error.
    pub fn require_ready(&self) -> ThemeResult<()> {
        if !self.root_exists {
            return Err(ThemeError::RootMissing(self.root.clone()));
        }
        if !self.template_exists {
            return Err(ThemeError::TemplateMissing(self.template.clone()));
        }
        Ok(())
    }

    pub fn require_root_dir(&self) -> ThemeResult<()> {
        if self.root_exists {
            Ok(())
        } else {
            Err(ThemeError::RootMissing(self.root.clone()))
        }
    }
}

pub fn probe(config: &ThemerConfig) -> Readiness {
    let template = config.template_path();
    let readiness = Readiness {
        root: config.install_root.clone(),
        root_exists: platform_detected(&config.install_root),
        template_exists: template.is_file(),
        serving_dir_exists: config.serving_dir_path().is_dir(),
        patched: template::file_is_patched(&template),
        active_theme_present: config.active_theme_path().is_file(),
        template,
    };
    debug!(
        root_exists = readiness.root_exists,
        template_exists = readiness.template_exists,
        patched = readiness.patched,
        "probe finished"
    );
    readiness
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_host_is_not_ready() {
        let tmp = TempDir::new().unwrap();
        let config = ThemerConfig::rooted_at(tmp.path());
        let r = probe(&config);
        assert!(!r.root_exists);
        assert!(r.is_degraded());
        assert!(matches!(r.require_ready(), Err(ThemeError::RootMissing(_))));
    }

    #[test]
    fn root_without_template() {
        let tmp = TempDir::new().unwrap();
        let config = ThemerConfig::rooted_at(tmp.path());
        fs::create_dir_all(&config.install_root).unwrap();
        let r = probe(&config);
        assert!(r.root_exists);
        assert!(!r.template_exists);
        assert!(r.require_root_dir().is_ok());
        assert!(matches!(r.require_ready(), Err(ThemeError::TemplateMissing(_))));
    }

    #[test]
    fn ready_and_patched() {
        let tmp = TempDir::new().unwrap();
        let config = ThemerConfig::rooted_at(tmp.path());
        fs::create_dir_all(config.serving_dir_path()).unwrap();
        let patched = template::apply_patch(b"<head></head>", &config.stylesheet_href).unwrap();
        if let template::Patched::Applied(text) = patched {
            fs::write(config.template_path(), text).unwrap();
        }
        let r = probe(&config);
        assert!(r.is_ready());
        assert!(r.patched);
        assert!(r.serving_dir_exists);
        assert!(!r.active_theme_present);
    }
}
