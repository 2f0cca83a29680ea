//! HTTP theme index
//!
//! The base URL serves `index.json`:
//!
//! ```json
//! [{ "name": "ocean-blue", "label": "Ocean Blue", "file": "ocean-blue.css" }]
//! ```
//!
//! `file` is resolved against the base URL unless it is already absolute.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use super::{ThemeCatalog, ThemeEntry, ThemeOrigin};
use crate::error::{ThemeError, ThemeResult};

pub const INDEX_FILE: &str = "index.json";
const MAX_STYLESHEET_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteIndexEntry {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub file: String,
}

pub struct RemoteCatalog {
    base_url: String,
    agent: ureq::Agent,
    user_agent: String,
}

impl RemoteCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build();
        Self {
            base_url: base_url.into(),
            agent,
            user_agent: format!("pvetheme/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Download the index and every stylesheet it lists.
    pub fn fetch(&self) -> ThemeResult<ThemeCatalog> {
        let index_url = join_url(&self.base_url, INDEX_FILE);
        let body = self.get(&index_url)?;
        let body = String::from_utf8(body)
            .map_err(|_| ThemeError::Catalog(format!("{index_url}: index is not UTF-8")))?;
        let index = parse_index(&body)?;
        debug!(url = %index_url, themes = index.len(), "remote index fetched");

        let mut entries = Vec::with_capacity(index.len());
        for item in index {
            let url = join_url(&self.base_url, &item.file);
            let content = self.get(&url)?;
            let mut entry = ThemeEntry::new(item.name, content, ThemeOrigin::Remote(url))?;
            if let Some(label) = item.label {
                entry = entry.with_label(label);
            }
            entries.push(entry);
        }
        info!(base = %self.base_url, themes = entries.len(), "remote catalog loaded");
        Ok(ThemeCatalog::from_entries(entries))
    }

    fn get(&self, url: &str) -> ThemeResult<Vec<u8>> {
        let response = self
            .agent
            .get(url)
            .set("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| ThemeError::Catalog(format!("failed to fetch {url}: {e}")))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_STYLESHEET_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| ThemeError::Catalog(format!("failed to read {url}: {e}")))?;
        if bytes.len() as u64 > MAX_STYLESHEET_BYTES {
            return Err(ThemeError::Catalog(format!(
                "{url} exceeds {MAX_STYLESHEET_BYTES} bytes"
            )));
        }
        Ok(bytes)
    }
}

pub fn parse_index(body: &str) -> ThemeResult<Vec<RemoteIndexEntry>> {
    serde_json::from_str(body)
        .map_err(|e| ThemeError::Catalog(format!("malformed theme index: {e}")))
}

pub fn join_url(base: &str, file: &str) -> String {
    if file.starts_with("http://") || file.starts_with("https://") {
        return file.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        file.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve `routes` over plain HTTP/1.1 on an ephemeral port, one
    /// connection per request. Returns the base URL.
    fn serve(routes: HashMap<&'static str, Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut header = String::new();
                    match reader.read_line(&mut header) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if header == "\r\n" => break,
                        Ok(_) => {}
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = match routes.get(path) {
                    Some(body) => ("200 OK", body.as_slice()),
                    None => ("404 Not Found", &b"not found"[..]),
                };
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                // The client may hang up early on oversized bodies.
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(body);
            }
        });
        format!("http://{addr}/themes")
    }

    #[test]
    fn fetch_builds_catalog_from_index() {
        let mut routes = HashMap::new();
        routes.insert(
            "/themes/index.json",
            br#"[
                {"name": "ocean-blue", "label": "Ocean Blue", "file": "ocean-blue.css"},
                {"name": "zen", "file": "zen.css"}
            ]"#
            .to_vec(),
        );
        routes.insert("/themes/ocean-blue.css", b":root { --bg: #003366; }\n".to_vec());
        routes.insert("/themes/zen.css", b"/* Theme: Zen Garden */\n".to_vec());
        let base = serve(routes);

        let catalog = RemoteCatalog::new(base.clone()).fetch().unwrap();
        let ocean = catalog.resolve("ocean-blue").unwrap();
        assert_eq!(ocean.label, "Ocean Blue");
        assert_eq!(ocean.content, b":root { --bg: #003366; }\n");
        assert_eq!(ocean.origin, ThemeOrigin::Remote(format!("{base}/ocean-blue.css")));

        let zen = catalog.resolve("zen").unwrap();
        assert_eq!(zen.label, "Zen Garden");
        assert_eq!(zen.content, b"/* Theme: Zen Garden */\n");

        let names: Vec<String> = catalog.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["ocean-blue", "zen"]);
    }

    #[test]
    fn oversized_stylesheet_is_rejected() {
        let mut routes = HashMap::new();
        routes.insert(
            "/themes/index.json",
            br#"[{"name": "huge", "file": "huge.css"}]"#.to_vec(),
        );
        routes.insert(
            "/themes/huge.css",
            vec![b' '; MAX_STYLESHEET_BYTES as usize + 1],
        );
        let base = serve(routes);

        let err = RemoteCatalog::new(base).fetch().unwrap_err();
        assert!(matches!(&err, ThemeError::Catalog(msg) if msg.contains("exceeds")), "{err}");
    }

    #[test]
    fn missing_stylesheet_is_a_catalog_error() {
        let mut routes = HashMap::new();
        routes.insert(
            "/themes/index.json",
            br#"[{"name": "gone", "file": "gone.css"}]"#.to_vec(),
        );
        let base = serve(routes);

        let err = RemoteCatalog::new(base).fetch().unwrap_err();
        assert!(matches!(err, ThemeError::Catalog(_)));
    }

    #[test]
    fn joins_relative_and_keeps_absolute() {
        assert_eq!(
            join_url("https://t.example/pve/", "ocean.css"),
            "https://t.example/pve/ocean.css"
        );
        assert_eq!(
            join_url("https://t.example/pve", "/ocean.css"),
            "https://t.example/pve/ocean.css"
        );
        assert_eq!(
            join_url("https://t.example/pve", "https://cdn.example/x.css"),
            "https://cdn.example/x.css"
        );
    }

    #[test]
    fn parses_index() {
        let index = parse_index(
            r#"[
                {"name": "ocean-blue", "label": "Ocean Blue", "file": "ocean-blue.css"},
                {"name": "zen", "file": "zen.css"}
            ]"#,
        )
        .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].label.as_deref(), Some("Ocean Blue"));
        assert_eq!(index[1].label, None);
    }

    #[test]
    fn rejects_malformed_index() {
        assert!(matches!(parse_index("{\"name\":1}"), Err(ThemeError::Catalog(_))));
    }
}
