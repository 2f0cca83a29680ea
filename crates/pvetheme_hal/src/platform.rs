//! Platform probes: privilege level and host detection.

use std::path::Path;

use crate::error::{HalError, HalResult};

/// Effective user id of the current process.
#[cfg(unix)]
pub fn effective_uid() -> u32 {
    nix::unistd::geteuid().as_raw()
}

#[cfg(not(unix))]
pub fn effective_uid() -> u32 {
    u32::MAX
}

/// Check if the process runs with root privileges
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Fail with a security error unless running as root.
pub fn require_elevated(operation: &str) -> HalResult<()> {
    if is_elevated() {
        Ok(())
    } else {
        Err(HalError::security_error(
            operation,
            "root",
            &format!("must be run as root (effective uid {})", effective_uid()),
        ))
    }
}

/// The console platform counts as detected when its install root exists.
pub fn platform_detected<P: AsRef<Path>>(install_root: P) -> bool {
    install_root.as_ref().is_dir()
}
