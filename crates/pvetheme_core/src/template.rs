//! Template patcher
//!
//! The console template is treated as three spans: the text before the
//! loader block, the block itself (absent when unpatched), and the text after
//! it. Inserting and removing the block are operations on those spans, which
//! is what makes `remove_patch(apply_patch(t)) == t` hold byte for byte.
//!
//! The block starts at [`MARKER`] and ends at the first `</script>` after it,
//! plus the single newline the patcher writes behind it.
//!
//! Spans are byte slices: the template is never decoded, so files in a
//! legacy encoding round-trip unchanged.

use std::borrow::Cow;
use std::path::Path;

use pvetheme_hal::fs as hal_fs;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ThemeError, ThemeResult};

/// Unique substring identifying the injected block
pub const MARKER: &str = "<!-- pvetheme:loader -->";

/// Class set on `<html>` while the console's own dark stylesheet is loaded
pub const DARK_CLASS: &str = "pvetheme-dark";

const BLOCK_END: &str = "</script>";
const HEAD_CLOSE: &str = "</head>";
const DARK_STYLESHEET_HINT: &str = "theme-proxmox-dark";

/// A template split around the loader block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSpans<'a> {
    pub prefix: &'a [u8],
    pub block: Option<&'a [u8]>,
    pub suffix: &'a [u8],
}

impl<'a> TemplateSpans<'a> {
    pub fn parse(template: &'a [u8]) -> ThemeResult<Self> {
        let Some(start) = find(template, MARKER.as_bytes()) else {
            return Ok(Self {
                prefix: template,
                block: None,
                suffix: &[],
            });
        };

        let close = find(&template[start..], BLOCK_END.as_bytes()).ok_or_else(|| {
            ThemeError::MalformedTemplate("loader marker without a closing </script>".to_string())
        })?;
        let mut end = start + close + BLOCK_END.len();
        if template[end..].starts_with(b"\n") {
            end += 1;
        }

        Ok(Self {
            prefix: &template[..start],
            block: Some(&template[start..end]),
            suffix: &template[end..],
        })
    }

    pub fn is_patched(&self) -> bool {
        self.block.is_some()
    }

    fn without_block(&self) -> Vec<u8> {
        [self.prefix, self.suffix].concat()
    }
}

/// Result of [`apply_patch`] on template bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patched {
    Applied(Vec<u8>),
    AlreadyPatched,
}

/// Result of [`remove_patch`] on template bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unpatched {
    Removed(Vec<u8>),
    NotPatched,
}

/// What a file-level patch did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Applied,
    AlreadyPatched,
}

/// What a file-level unpatch did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpatchStatus {
    Removed,
    NotPatched,
}

/// Build the loader block for `stylesheet_href`, trailing newline included.
pub fn loader_block(stylesheet_href: &str) -> String {
    format!(
        r#"{MARKER}
<link rel="stylesheet" type="text/css" href="{href}">
<script type="text/javascript">
(function () {{
    var root = document.documentElement;
    function syncDarkClass() {{
        var dark = document.querySelector('link[rel="stylesheet"][href*="{DARK_STYLESHEET_HINT}"]') !== null;
        root.classList.toggle('{DARK_CLASS}', dark);
    }}
    new MutationObserver(syncDarkClass).observe(document.head, {{
        childList: true,
        subtree: true,
        attributes: true,
        attributeFilter: ['href']
    }});
    syncDarkClass();
}})();
{BLOCK_END}
"#,
        href = escape_attr(stylesheet_href),
    )
}

fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(|c| matches!(c, '&' | '"' | '<' | '>')) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Byte offset of the first `</head>`, ASCII case-insensitive.
fn find_head_close(template: &[u8]) -> Option<usize> {
    template
        .windows(HEAD_CLOSE.len())
        .position(|w| w.eq_ignore_ascii_case(HEAD_CLOSE.as_bytes()))
}

pub fn is_patched(template: &[u8]) -> bool {
    find(template, MARKER.as_bytes()).is_some()
}

/// Insert the loader block before the first `</head>`.
///
/// A template that already carries the marker is left alone. A template with
/// no `</head>` is rejected with [`ThemeError::TagNotFound`].
pub fn apply_patch(template: &[u8], stylesheet_href: &str) -> ThemeResult<Patched> {
    let spans = TemplateSpans::parse(template)?;
    if spans.is_patched() {
        return Ok(Patched::AlreadyPatched);
    }

    let at = find_head_close(template).ok_or(ThemeError::TagNotFound)?;
    let block = loader_block(stylesheet_href);

    Ok(Patched::Applied(
        [&template[..at], block.as_bytes(), &template[at..]].concat(),
    ))
}

/// Remove every loader block. No marker means nothing to do.
pub fn remove_patch(template: &[u8]) -> ThemeResult<Unpatched> {
    let mut current = Cow::Borrowed(template);
    let mut removed = 0usize;

    loop {
        let next = {
            let spans = TemplateSpans::parse(&current)?;
            if !spans.is_patched() {
                break;
            }
            spans.without_block()
        };
        current = Cow::Owned(next);
        removed += 1;
    }

    if removed == 0 {
        Ok(Unpatched::NotPatched)
    } else {
        debug!(blocks = removed, "loader blocks removed");
        Ok(Unpatched::Removed(current.into_owned()))
    }
}

fn read_template(path: &Path) -> ThemeResult<Vec<u8>> {
    hal_fs::read_optional(path)?.ok_or_else(|| ThemeError::TemplateMissing(path.to_path_buf()))
}

/// Patch the template file in place. Nothing is written unless the
/// text changes, and the write is an atomic replace.
pub fn patch_file(path: &Path, stylesheet_href: &str) -> ThemeResult<PatchStatus> {
    let text = read_template(path)?;
    match apply_patch(&text, stylesheet_href)? {
        Patched::AlreadyPatched => {
            info!(template = %path.display(), "template already patched");
            Ok(PatchStatus::AlreadyPatched)
        }
        Patched::Applied(patched) => {
            hal_fs::write_atomic(path, &patched)?;
            info!(template = %path.display(), href = stylesheet_href, "loader block inserted");
            Ok(PatchStatus::Applied)
        }
    }
}

/// Remove the loader block from the template file in place.
pub fn unpatch_file(path: &Path) -> ThemeResult<UnpatchStatus> {
    let text = read_template(path)?;
    match remove_patch(&text)? {
        Unpatched::NotPatched => Ok(UnpatchStatus::NotPatched),
        Unpatched::Removed(clean) => {
            hal_fs::write_atomic(path, &clean)?;
            info!(template = %path.display(), "loader block removed");
            Ok(UnpatchStatus::Removed)
        }
    }
}

/// Whether the template file on disk carries the marker. Missing or
/// unreadable files count as unpatched.
pub fn file_is_patched(path: &Path) -> bool {
    matches!(hal_fs::read_optional(path), Ok(Some(bytes)) if is_patched(&bytes))
}
