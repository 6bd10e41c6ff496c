//! Single-instance lock
//!
//! Two updaters installing packages at once would fight over the servicing
//! stack, so a run holds an advisory lock on `<workdir>/triquetra.lock`.
//! The lock is released when the guard drops, and by the OS if the process
//! dies.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fslock::LockFile;
use tracing::debug;

use crate::error::{Result, TriquetraError, fs as fs_error};

/// Name of the lock file inside the working directory
pub const LOCK_FILE: &str = "triquetra.lock";

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// RAII guard for the instance lock
#[derive(Debug)]
pub struct InstanceGuard {
    lock: LockFile,
    lock_path: PathBuf,
}

impl InstanceGuard {
    /// Take the lock without waiting; another holder is `InstanceLocked`
    pub fn acquire(workdir: &Path) -> Result<Self> {
        fs::create_dir_all(workdir).map_err(|e| fs_error::write_failed(workdir, e))?;
        let lock_path = workdir.join(LOCK_FILE);

        let mut lock = LockFile::open(&lock_path).map_err(|e| TriquetraError::LockFailed {
            reason: format!("Failed to open lock file: {e}"),
        })?;
        let acquired = lock.try_lock_with_pid().map_err(|e| TriquetraError::LockFailed {
            reason: format!("Failed to try lock: {e}"),
        })?;
        if !acquired {
            return Err(TriquetraError::InstanceLocked);
        }

        debug!(path = %lock_path.display(), "acquired instance lock");
        Ok(Self { lock, lock_path })
    }

    /// Take the lock, retrying while another holder is still exiting.
    ///
    /// A relaunched updater uses this: its parent releases the lock just
    /// before spawning it but may still be running.
    pub fn acquire_waiting(workdir: &Path, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        loop {
            match Self::acquire(workdir) {
                Err(TriquetraError::InstanceLocked) if Instant::now() < deadline => {
                    thread::sleep(RETRY_INTERVAL);
                }
                other => return other,
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    /// Unlock before handing the working directory to another process
    pub fn release(self) {
        debug!(path = %self.lock_path.display(), "released instance lock");
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let _ = self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_instance_is_refused() {
        let temp = TempDir::new().unwrap();
        let first = InstanceGuard::acquire(temp.path()).unwrap();
        assert!(first.path().ends_with(LOCK_FILE));

        let second = InstanceGuard::acquire(temp.path());
        assert!(matches!(second, Err(TriquetraError::InstanceLocked)));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp = TempDir::new().unwrap();
        drop(InstanceGuard::acquire(temp.path()).unwrap());
        assert!(InstanceGuard::acquire(temp.path()).is_ok());
    }

    #[test]
    fn test_released_guard_admits_next_instance() {
        let temp = TempDir::new().unwrap();
        InstanceGuard::acquire(temp.path()).unwrap().release();
        assert!(InstanceGuard::acquire(temp.path()).is_ok());
    }

    #[test]
    fn test_waiting_acquire_succeeds_once_holder_exits() {
        let temp = TempDir::new().unwrap();
        let holder = InstanceGuard::acquire(temp.path()).unwrap();
        let workdir = temp.path().to_path_buf();
        let waiter = thread::spawn(move || {
            InstanceGuard::acquire_waiting(&workdir, Duration::from_secs(5)).map(|_| ())
        });

        thread::sleep(Duration::from_millis(300));
        holder.release();
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn test_waiting_acquire_gives_up_after_timeout() {
        let temp = TempDir::new().unwrap();
        let _holder = InstanceGuard::acquire(temp.path()).unwrap();
        let result = InstanceGuard::acquire_waiting(temp.path(), Duration::from_millis(250));
        assert!(matches!(result, Err(TriquetraError::InstanceLocked)));
    }

    #[test]
    fn test_creates_workdir() {
        let temp = TempDir::new().unwrap();
        let workdir = temp.path().join("nested").join("workdir");
        let _guard = InstanceGuard::acquire(&workdir).unwrap();
        assert!(workdir.join(LOCK_FILE).exists());
    }
}
