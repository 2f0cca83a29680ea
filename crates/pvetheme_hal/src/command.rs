//! Command execution
//!
//! Builder over `std::process::Command` whose failures carry the program name,
//! used for the one external call the tool makes (restarting the console proxy).

use crate::error::{HalError, HalResult};
use std::ffi::OsStr;
use std::process::{Command as StdCommand, Stdio};

/// Command builder and executor
pub struct Command {
    program: String,
    inner: StdCommand,
}

impl Command {
    /// Create a new command with the given program
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_string_lossy().into_owned(),
            inner: StdCommand::new(program),
        }
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    /// Execute the command and capture output
    pub fn output(&mut self) -> HalResult<CommandResult> {
        let output = self
            .inner
            .stdin(Stdio::null())
            .output()
            .map_err(|e| HalError::process_error("output", &self.program, None, &e.to_string()))?;
        Ok(CommandResult::new(
            output.status.code().unwrap_or(-1),
            output.stdout,
            output.stderr,
        ))
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandResult {
    pub fn new(exit_code: i32, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
        }
    }

    /// Check if the command was successful
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get stderr as lossy UTF-8, trimmed
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Execute a command line given as `[program, args...]`.
pub fn execute_argv<S: AsRef<str>>(argv: &[S]) -> HalResult<CommandResult> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| HalError::invalid("empty command line"))?;
    Command::new(program.as_ref())
        .args(args.iter().map(|a| a.as_ref()))
        .output()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn execute_argv_reports_exit_code() {
        let ok = execute_argv(&["true"]).expect("spawn true");
        assert!(ok.success());
        let failed = execute_argv(&["false"]).expect("spawn false");
        assert!(!failed.success());
    }

    #[test]
    fn execute_argv_rejects_empty() {
        let empty: [&str; 0] = [];
        assert!(matches!(execute_argv(&empty), Err(HalError::Invalid(_))));
    }

    #[test]
    fn missing_program_is_process_error() {
        let err = execute_argv(&["/definitely/not/a/program"]).expect_err("must fail");
        match err {
            HalError::Process(p) => assert_eq!(p.program, "/definitely/not/a/program"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
