//! Host lock and privilege checks for mutating commands.
//!
//! Only one invocation may change the host's unit, config and gc-root
//! directories at a time. The lock is an exclusive `flock` on
//! `<state_dir>/lock`, released when the guard is dropped or the process
//! exits.

use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Guard holding the host lock.
#[derive(Debug)]
pub struct HostLock {
    file: File,
    path: PathBuf,
}

impl HostLock {
    /// Take the lock in `state_dir` without blocking.
    ///
    /// Fails with [`Error::Locked`] if another process holds it.
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        fs::create_dir_all(state_dir)?;
        let path = state_dir.join("lock");

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        #[allow(unsafe_code)]
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result != 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Err(Error::Locked(path));
            }
            return Err(err.into());
        }

        log::debug!("Acquired host lock {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HostLock {
    fn drop(&mut self) {
        #[allow(unsafe_code)]
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
        log::debug!("Released host lock {}", self.path.display());
    }
}

/// Fail with [`Error::PermissionDenied`] unless running as root.
pub fn require_root(operation: &str) -> Result<()> {
    #[allow(unsafe_code)]
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        return Err(Error::PermissionDenied(format!(
            "{operation} must be run as root"
        )));
    }
    Ok(())
}
