//! pvetheme Hardware Abstraction Layer (HAL)
//!
//! Everything that touches the host lives here: file reads and atomic
//! replacement, pattern-based listing, child processes and privilege probes.
//! The core crate stays free of direct `std::fs`/`std::process` calls so its
//! state machine can be tested against temp directories.

pub mod command;
pub mod error;
pub mod fs;
pub mod platform;

pub use error::{HalError, HalResult};

pub use command::{execute_argv, Command, CommandResult};
pub use fs::FilePatterns;
pub use platform::{is_elevated, platform_detected, require_elevated};
