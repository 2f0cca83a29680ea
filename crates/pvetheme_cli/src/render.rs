//! Text and JSON output
//!
//! Reports go to the given writer (stdout in `main`); failures render as a
//! summary with the error kind, never a backtrace.

use std::io::{self, Write};

use nu_ansi_term::{Color, Style};
use pvetheme_core::palette::Swatch;
use pvetheme_core::{
    PatchStatus, Readiness, RestartStatus, StatusReport, ThemeError, ThemeSummary, UnpatchStatus,
};
use serde_json::json;

use crate::dispatch::{Outcome, SnapshotListing};

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    json: bool,
    color: bool,
}

impl Renderer {
    pub fn new(json: bool, color: bool) -> Self {
        Self { json, color }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.color {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn ok(&self, text: &str) -> String {
        self.paint(Color::Green.bold(), text)
    }

    fn warn(&self, text: &str) -> String {
        self.paint(Color::Yellow.bold(), text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(Style::new().dimmed(), text)
    }

    pub fn outcome<W: Write>(&self, outcome: &Outcome, out: &mut W) -> io::Result<()> {
        let warnings = outcome.warnings();
        if self.json {
            let doc = json!({ "ok": true, "outcome": outcome, "warnings": warnings });
            serde_json::to_writer_pretty(&mut *out, &doc)?;
            return writeln!(out);
        }

        match outcome {
            Outcome::Overview { status, themes } => {
                self.status(status, out)?;
                writeln!(out)?;
                self.themes(themes, out)?;
            }
            Outcome::List(themes) => self.themes(themes, out)?,
            Outcome::Status(status) => self.status(status, out)?,
            Outcome::Install(report) => {
                writeln!(out, "{} snapshot {}", self.ok("✓"), report.snapshot.id)?;
                let patch = match report.patch {
                    PatchStatus::Applied => "loader block inserted",
                    PatchStatus::AlreadyPatched => "template already patched",
                };
                writeln!(out, "{} {patch}", self.ok("✓"))?;
                writeln!(
                    out,
                    "{} theme {} ({}) written to {}",
                    self.ok("✓"),
                    report.theme.name,
                    report.theme.label,
                    report.theme.path.display()
                )?;
                self.restart(&report.restart, out)?;
            }
            Outcome::Restore { report, restart } => {
                writeln!(out, "Restored snapshot {}", report.snapshot)?;
                if report.template_restored {
                    writeln!(out, "{} template restored", self.ok("✓"))?;
                }
                writeln!(out, "{} {} theme file(s) removed", self.ok("✓"), report.removed.len())?;
                if !report.reinstated.is_empty() {
                    writeln!(
                        out,
                        "{} {} theme file(s) reinstated",
                        self.ok("✓"),
                        report.reinstated.len()
                    )?;
                }
                self.restart(restart, out)?;
            }
            Outcome::Backup(report) => {
                writeln!(out, "Snapshot {} created at {}", report.id, report.path.display())?;
                writeln!(
                    out,
                    "  {} file(s) copied, {} failed",
                    report.copied, report.failed
                )?;
            }
            Outcome::Preview(preview) => {
                writeln!(out, "{} ({})", preview.label, preview.name)?;
                writeln!(out, "  source: {}", preview.origin)?;
                writeln!(out, "  size:   {} bytes", preview.size)?;
                if preview.palette.is_empty() {
                    writeln!(out, "  palette: {}", self.dim("no colours found"))?;
                } else {
                    writeln!(out, "  palette:")?;
                    for swatch in &preview.palette {
                        writeln!(out, "    {}", self.swatch(swatch))?;
                    }
                }
            }
            Outcome::Uninstall(report) => {
                if let Some(snapshot) = &report.snapshot {
                    writeln!(out, "{} safety snapshot {}", self.ok("✓"), snapshot.id)?;
                }
                let unpatch = match report.unpatch {
                    UnpatchStatus::Removed => "loader block removed",
                    UnpatchStatus::NotPatched => "template was not patched",
                };
                writeln!(out, "{} {unpatch}", self.ok("✓"))?;
                writeln!(
                    out,
                    "{} {} theme file(s) removed",
                    self.ok("✓"),
                    report.sweep.removed.len()
                )?;
                self.restart(&report.restart, out)?;
            }
            Outcome::Snapshots(listings) => self.snapshots(listings, out)?,
            Outcome::Prune(report) => {
                writeln!(
                    out,
                    "Kept {} snapshot(s), removed {}",
                    report.kept.len(),
                    report.removed.len()
                )?;
                for id in &report.removed {
                    writeln!(out, "  - {id}")?;
                }
            }
            Outcome::Config(text) => write!(out, "{text}")?,
        }

        for warning in warnings {
            writeln!(out, "{} {warning}", self.warn("warning:"))?;
        }
        Ok(())
    }

    /// Error summary; JSON goes to `out`, text to `err`.
    pub fn error<W: Write, E: Write>(&self, error: &ThemeError, out: &mut W, err: &mut E) -> io::Result<()> {
        if self.json {
            let doc = json!({
                "ok": false,
                "error": { "kind": error.kind(), "message": error.to_string() },
            });
            serde_json::to_writer_pretty(&mut *out, &doc)?;
            return writeln!(out);
        }
        writeln!(err, "{} {error}", self.paint(Color::Red.bold(), "error:"))
    }

    fn restart<W: Write>(&self, status: &RestartStatus, out: &mut W) -> io::Result<()> {
        match status {
            RestartStatus::Restarted => writeln!(out, "{} console proxy restarted", self.ok("✓")),
            RestartStatus::Skipped => writeln!(out, "{} restart skipped", self.dim("-")),
            // Reported through the warnings list
            RestartStatus::Failed { .. } => Ok(()),
        }
    }

    fn themes<W: Write>(&self, themes: &[ThemeSummary], out: &mut W) -> io::Result<()> {
        if themes.is_empty() {
            return writeln!(out, "No themes available");
        }
        writeln!(out, "Available themes:")?;
        let width = themes.iter().map(|t| t.name.len()).max().unwrap_or(0);
        for theme in themes {
            writeln!(out, "  {:<width$}  {}", theme.name, self.dim(&theme.label))?;
        }
        Ok(())
    }

    fn status<W: Write>(&self, status: &StatusReport, out: &mut W) -> io::Result<()> {
        let Readiness {
            root,
            template,
            root_exists,
            template_exists,
            patched,
            ..
        } = &status.readiness;
        let mark = |ok: bool| if ok { self.ok("yes") } else { self.warn("no") };

        writeln!(out, "Install root:  {} ({})", root.display(), mark(*root_exists))?;
        writeln!(out, "Template:      {} ({})", template.display(), mark(*template_exists))?;
        writeln!(out, "Patched:       {}", mark(*patched))?;
        let active = match (&status.active_theme, status.active_theme_unrecognized) {
            (Some(name), _) => name.clone(),
            (None, true) => "unrecognized stylesheet".to_string(),
            (None, false) if status.readiness.active_theme_present => "unknown".to_string(),
            (None, false) => "none".to_string(),
        };
        writeln!(out, "Active theme:  {active}")?;
        let latest = status
            .latest_snapshot
            .as_ref()
            .map(|id| format!(", latest {id}"))
            .unwrap_or_default();
        writeln!(out, "Snapshots:     {}{latest}", status.snapshot_count)
    }

    fn snapshots<W: Write>(&self, listings: &[SnapshotListing], out: &mut W) -> io::Result<()> {
        if listings.is_empty() {
            return writeln!(out, "No snapshots");
        }
        for listing in listings {
            match &listing.metadata {
                Some(meta) => {
                    let state = if meta.success { self.ok("ok") } else { self.warn("partial") };
                    let template = if meta.template_copied { "template" } else { "no template" };
                    writeln!(
                        out,
                        "{}  {}  {} file(s), {template}, {state}",
                        listing.id,
                        self.dim(&meta.created_at.to_rfc3339()),
                        meta.file_count
                    )?;
                }
                None => writeln!(out, "{}  {}", listing.id, self.warn("metadata unreadable"))?,
            }
        }
        Ok(())
    }

    /// Hex code, painted on its own colour when colour is on.
    fn swatch(&self, swatch: &Swatch) -> String {
        let c = swatch.color;
        let code = if self.color {
            let fg = if c.is_dark() { Color::White } else { Color::Black };
            fg.on(Color::Rgb(c.r, c.g, c.b)).paint(format!(" {c} ")).to_string()
        } else {
            c.to_string()
        };
        match &swatch.name {
            Some(name) => format!("{code} --{name}"),
            None => code,
        }
    }
}
