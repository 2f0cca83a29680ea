mod cli;
mod dispatch;
mod render;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use is_terminal::IsTerminal;
use pvetheme_core::logging::{init_logging, LoggingOptions};
use pvetheme_core::{ThemeResult, ThemerConfig};
use tracing::debug;

use crate::cli::Cli;
use crate::dispatch::{execute, Context, Request};
use crate::render::Renderer;

fn main() -> ExitCode {
    // Usage errors exit 1 like every other invalid selection.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let color = !cli.no_color
        && !cli.json
        && std::env::var_os("NO_COLOR").is_none()
        && io::stdout().is_terminal();
    let renderer = Renderer::new(cli.json, color);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stderr = io::stderr();
    let mut err = stderr.lock();

    match prepare(cli).and_then(|(request, ctx)| execute(&request, &ctx)) {
        Ok(outcome) => {
            renderer
                .outcome(&outcome, &mut out)
                .context("failed to write report")?;
            out.flush().context("failed to flush stdout")?;
            // Partial failures and failed restarts are warnings, not errors.
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            debug!(kind = ?e.kind(), error = %e, "command failed");
            renderer
                .error(&e, &mut out, &mut err)
                .context("failed to write error summary")?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Load configuration, start logging and turn the command line into a request.
fn prepare(cli: &Cli) -> ThemeResult<(Request, Context)> {
    let loaded = ThemerConfig::load(cli.config.as_deref());

    let logging = match &loaded {
        Ok(config) => LoggingOptions::from(&config.logging),
        Err(_) => LoggingOptions::default(),
    }
    .with_verbosity(cli.verbose, cli.quiet);
    init_logging(&logging);

    let mut config = loaded?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let request = Request::from_cli(cli)?;
    debug!(request = request.name(), root = %config.install_root.display(), "request parsed");
    Ok((
        request,
        Context {
            config,
            no_restart: cli.no_restart,
        },
    ))
}
