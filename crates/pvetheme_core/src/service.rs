//! Console proxy restart
//!
//! A failed restart is reported, never raised: by the time it runs the files
//! are already in place and the operator can restart by hand.

use pvetheme_hal::execute_argv;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestartStatus {
    Restarted,
    Skipped,
    Failed { message: String },
}

pub trait ServiceNotifier {
    fn restart(&self) -> RestartStatus;
}

/// Runs a configured command line
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    argv: Vec<String>,
}

impl CommandNotifier {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl ServiceNotifier for CommandNotifier {
    fn restart(&self) -> RestartStatus {
        if self.argv.is_empty() {
            return RestartStatus::Failed {
                message: "empty restart command".to_string(),
            };
        }
        match execute_argv(self.argv.as_slice()) {
            Ok(result) if result.success() => {
                info!(command = %self.argv.join(" "), "service restarted");
                RestartStatus::Restarted
            }
            Ok(result) => {
                let stderr = result.stderr_lossy();
                let message = if stderr.is_empty() {
                    format!("{} exited with status {}", self.argv.join(" "), result.exit_code)
                } else {
                    format!(
                        "{} exited with status {}: {stderr}",
                        self.argv.join(" "),
                        result.exit_code
                    )
                };
                warn!("{message}");
                RestartStatus::Failed { message }
            }
            Err(e) => {
                warn!(command = %self.argv.join(" "), error = %e, "restart command failed to run");
                RestartStatus::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// `--no-restart` and `service.enabled = false`
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl ServiceNotifier for DisabledNotifier {
    fn restart(&self) -> RestartStatus {
        RestartStatus::Skipped
    }
}

pub fn notifier_from_config(config: &ServiceConfig, no_restart: bool) -> Box<dyn ServiceNotifier> {
    if no_restart || !config.enabled {
        Box::new(DisabledNotifier)
    } else {
        Box::new(CommandNotifier::new(config.restart_command.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_skips() {
        let config = ServiceConfig {
            enabled: false,
            restart_command: vec!["true".into()],
        };
        assert_eq!(notifier_from_config(&config, false).restart(), RestartStatus::Skipped);
        assert_eq!(
            notifier_from_config(&ServiceConfig::default(), true).restart(),
            RestartStatus::Skipped
        );
    }

    #[test]
    fn empty_command_fails_softly() {
        assert!(matches!(
            CommandNotifier::new(Vec::new()).restart(),
            RestartStatus::Failed { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_decides() {
        assert_eq!(CommandNotifier::new(vec!["true".into()]).restart(), RestartStatus::Restarted);
        for argv in [vec!["false".to_string()], vec!["pvetheme-no-such-program".to_string()]] {
            assert!(matches!(
                CommandNotifier::new(argv).restart(),
                RestartStatus::Failed { .. }
            ));
        }
    }
}
