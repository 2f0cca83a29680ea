//! Theme catalog
//!
//! An ordered set of named stylesheets. The rest of the crate only sees
//! name → bytes; whether they came from a directory or an HTTP index is
//! recorded in [`ThemeOrigin`] for display.

#[cfg(feature = "remote-catalog")]
pub mod remote;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pvetheme_hal::{fs as hal_fs, FilePatterns};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::error::{ThemeError, ThemeResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum ThemeOrigin {
    Local(PathBuf),
    Remote(String),
}

impl std::fmt::Display for ThemeOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeOrigin::Local(path) => write!(f, "{}", path.display()),
            ThemeOrigin::Remote(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeEntry {
    pub name: String,
    pub label: String,
    pub content: Vec<u8>,
    pub origin: ThemeOrigin,
}

impl ThemeEntry {
    pub fn new(name: impl Into<String>, content: Vec<u8>, origin: ThemeOrigin) -> ThemeResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        let label = label_from_content(&content).unwrap_or_else(|| title_case(&name));
        Ok(Self {
            name,
            label,
            content,
            origin,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !label.trim().is_empty() {
            self.label = label.trim().to_string();
        }
        self
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn content_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Summary line for listings
#[derive(Debug, Clone, Serialize)]
pub struct ThemeSummary {
    pub name: String,
    pub label: String,
    pub size: usize,
    pub origin: ThemeOrigin,
}

impl From<&ThemeEntry> for ThemeSummary {
    fn from(entry: &ThemeEntry) -> Self {
        Self {
            name: entry.name.clone(),
            label: entry.label.clone(),
            size: entry.size(),
            origin: entry.origin.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThemeCatalog {
    entries: Vec<ThemeEntry>,
}

impl ThemeCatalog {
    /// Build from entries; sorted by name, later duplicates dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = ThemeEntry>) -> Self {
        let mut sorted: Vec<ThemeEntry> = Vec::new();
        for entry in entries {
            if sorted.iter().any(|e| e.name == entry.name) {
                warn!(theme = %entry.name, "duplicate theme name ignored");
                continue;
            }
            sorted.push(entry);
        }
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries: sorted }
    }

    /// Every `*.css` file in `dir`, named by file stem. A missing directory
    /// yields an empty catalog.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> ThemeResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "theme directory not found");
            return Ok(Self::default());
        }
        let css = FilePatterns::new(&["*.css"])?;
        let mut entries = Vec::new();
        for path in hal_fs::list_matching(dir, &css)? {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Err(e) = validate_name(stem) {
                warn!(file = %path.display(), error = %e, "skipping theme file");
                continue;
            }
            let content = hal_fs::read(&path)?;
            entries.push(ThemeEntry::new(stem, content, ThemeOrigin::Local(path.clone()))?);
        }
        debug!(dir = %dir.display(), themes = entries.len(), "local catalog loaded");
        Ok(Self::from_entries(entries))
    }

    pub fn get(&self, name: &str) -> Option<&ThemeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Exact name lookup
    pub fn resolve(&self, name: &str) -> ThemeResult<&ThemeEntry> {
        self.get(name)
            .ok_or_else(|| ThemeError::ThemeNotFound(name.to_string()))
    }

    /// The theme whose bytes equal `content`, if any
    pub fn find_by_content(&self, content: &[u8]) -> Option<&ThemeEntry> {
        self.entries.iter().find(|e| e.content == content)
    }

    pub fn summaries(&self) -> Vec<ThemeSummary> {
        self.entries.iter().map(ThemeSummary::from).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load the catalog described by the configuration.
pub fn load_catalog(config: &CatalogConfig) -> ThemeResult<ThemeCatalog> {
    let catalog = match config {
        CatalogConfig::Local { dir } => ThemeCatalog::from_dir(dir)?,
        #[cfg(feature = "remote-catalog")]
        CatalogConfig::Remote { url } => remote::RemoteCatalog::new(url.clone()).fetch()?,
        #[cfg(not(feature = "remote-catalog"))]
        CatalogConfig::Remote { url } => {
            return Err(ThemeError::Catalog(format!(
                "remote catalog {url} requested but this build has no remote-catalog support"
            )))
        }
    };
    if catalog.is_empty() {
        warn!(source = ?config, "theme catalog is empty");
    }
    Ok(catalog)
}

/// Theme names end up in file paths and URLs: ASCII letters, digits,
/// `-`, `_` and `.`, not starting with a dot.
pub fn validate_name(name: &str) -> ThemeResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ThemeError::Catalog(format!("invalid theme name '{name}'")))
    }
}

fn label_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/\*+\s*(?:theme|name)\s*:\s*([^*\r\n]+?)\s*\*+/").ok())
        .as_ref()
}

/// `/* Theme: Ocean Blue */` anywhere near the top of the stylesheet.
fn label_from_content(content: &[u8]) -> Option<String> {
    let head = &content[..content.len().min(4096)];
    let text = String::from_utf8_lossy(head);
    label_regex()?
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

fn title_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn labels() {
        assert_eq!(title_case("ocean-blue"), "Ocean Blue");
        assert_eq!(title_case("solarized_dark"), "Solarized Dark");
        assert_eq!(
            label_from_content(b"/* Theme: Midnight Purple */\nbody{}").as_deref(),
            Some("Midnight Purple")
        );
        assert_eq!(label_from_content(b"body{color:red}"), None);
    }

    #[test]
    fn names_are_validated() {
        assert!(validate_name("ocean-blue").is_ok());
        assert!(validate_name("v2.1_dark").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("a b").is_err());
    }

    #[test]
    fn loads_directory_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("zen.css"), b"/* Theme: Zen Garden */").unwrap();
        fs::write(tmp.path().join("ocean-blue.css"), b":root{--bg:#003366}").unwrap();
        fs::write(tmp.path().join("README.md"), b"not a theme").unwrap();

        let catalog = ThemeCatalog::from_dir(tmp.path()).unwrap();
        let names: Vec<String> = catalog.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["ocean-blue", "zen"]);
        assert_eq!(catalog.resolve("zen").unwrap().label, "Zen Garden");
        assert_eq!(catalog.resolve("ocean-blue").unwrap().label, "Ocean Blue");
        assert!(matches!(catalog.resolve("foo"), Err(ThemeError::ThemeNotFound(_))));
    }

    #[test]
    fn missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let catalog = ThemeCatalog::from_dir(tmp.path().join("nope")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn content_match() {
        let origin = ThemeOrigin::Remote("https://x/a.css".into());
        let catalog = ThemeCatalog::from_entries(vec![
            ThemeEntry::new("a", b"A".to_vec(), origin.clone()).unwrap(),
            ThemeEntry::new("b", b"B".to_vec(), origin.clone()).unwrap(),
            ThemeEntry::new("a", b"other".to_vec(), origin).unwrap(),
        ]);
        assert_eq!(catalog.summaries().len(), 2);
        assert_eq!(catalog.find_by_content(b"B").map(|e| e.name.as_str()), Some("b"));
        assert!(catalog.find_by_content(b"C").is_none());
    }
}
