//! Directory locks for clip output.

use crate::constants::LOCK_FILE_NAME;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Lock file content for debugging.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that holds the lock.
    pub pid: u32,
    /// Hostname of the machine.
    pub hostname: String,
    /// When the lock was acquired.
    pub started: DateTime<Utc>,
    /// Product group being clipped.
    pub group: String,
}

/// RAII guard over one clip directory.
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
}

impl FileLock {
    /// Lock `dir` for a clip run of `group`.
    ///
    /// A lock left by a dead process on this host, or one older than
    /// `max_age`, is removed and acquisition retried once. Otherwise fails
    /// with [`Error::FileLocked`] naming the holder.
    pub fn acquire(dir: &Path, group: &str, max_age: Duration) -> Result<Self> {
        let lock_path = Self::lock_path_for(dir);

        match Self::create(&lock_path, group) {
            Err(Error::FileLocked { .. }) if Self::is_stale(&lock_path, max_age) => {
                warn!("Taking over stale lock {}", lock_path.display());
                Self::remove_stale(&lock_path)?;
                Self::create(&lock_path, group)
            }
            other => other,
        }
    }

    fn create(lock_path: &Path, group: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path);

        match file {
            Ok(mut f) => {
                let info = LockInfo {
                    pid: std::process::id(),
                    hostname: current_hostname(),
                    started: Utc::now(),
                    group: group.to_string(),
                };

                let json = serde_json::to_string_pretty(&info).unwrap_or_else(|_| "{}".to_string());
                let _ = f.write_all(json.as_bytes());

                register_lock(lock_path);

                Ok(Self {
                    lock_path: lock_path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::FileLocked {
                path: lock_path.to_path_buf(),
                holder: read_info(lock_path)
                    .map_or_else(|| "another process".to_string(), |info| info.describe()),
            }),
            Err(e) => Err(Error::LockCreate {
                path: lock_path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Lock file inside `dir`.
    pub fn lock_path_for(dir: &Path) -> PathBuf {
        dir.join(LOCK_FILE_NAME)
    }

    /// Whether the lock at `lock_path` can be taken over.
    ///
    /// An unreadable lock is judged by its modification time alone.
    pub fn is_stale(lock_path: &Path, max_age: Duration) -> bool {
        let Some(info) = read_info(lock_path) else {
            return fs::metadata(lock_path)
                .and_then(|m| m.modified())
                .is_ok_and(|modified| modified.elapsed().unwrap_or_default() > max_age);
        };

        if info.hostname == current_hostname() && !process_alive(info.pid) {
            return true;
        }
        (Utc::now() - info.started)
            .to_std()
            .is_ok_and(|age| age > max_age)
    }

    fn remove_stale(lock_path: &Path) -> Result<()> {
        match fs::remove_file(lock_path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Error::LockRemove {
                path: lock_path.to_path_buf(),
                source: e,
            }),
            _ => Ok(()),
        }
    }
}

impl LockInfo {
    fn describe(&self) -> String {
        format!(
            "pid {} on {} (group {}, since {})",
            self.pid,
            self.hostname,
            self.group,
            self.started.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
        unregister_lock(&self.lock_path);
    }
}

fn read_info(lock_path: &Path) -> Option<LockInfo> {
    let text = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&text).ok()
}

fn current_hostname() -> String {
    hostname::get().map_or_else(
        |_| "unknown".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

/// Without a process table to consult, only age can free a lock.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Global registry of active lock paths for cleanup on signal.
static ACTIVE_LOCKS: std::sync::LazyLock<std::sync::Mutex<Vec<PathBuf>>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(Vec::new()));

/// Register a lock path for cleanup on signal.
pub fn register_lock(path: &Path) {
    if let Ok(mut locks) = ACTIVE_LOCKS.lock() {
        locks.push(path.to_path_buf());
    }
}

/// Unregister a lock path after normal cleanup.
pub fn unregister_lock(path: &Path) {
    if let Ok(mut locks) = ACTIVE_LOCKS.lock() {
        locks.retain(|p| p != path);
    }
}

/// Clean up all registered locks. Called on signal.
pub fn cleanup_all_locks() {
    if let Ok(locks) = ACTIVE_LOCKS.lock() {
        for lock_path in locks.iter() {
            let _ = fs::remove_file(lock_path);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    /// Serializes tests that hold registered locks against the global cleanup.
    static REGISTRY: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn registry() -> std::sync::MutexGuard<'static, ()> {
        REGISTRY.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_lock(dir: &Path, pid: u32, hostname: &str, started: DateTime<Utc>) {
        let info = LockInfo {
            pid,
            hostname: hostname.to_string(),
            started,
            group: "g".to_string(),
        };
        fs::write(
            FileLock::lock_path_for(dir),
            serde_json::to_string(&info).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_acquire_and_release_lock() {
        let _guard = registry();
        let temp_dir = TempDir::new().unwrap();
        let lock_path = FileLock::lock_path_for(temp_dir.path());

        let lock = FileLock::acquire(temp_dir.path(), "ci01_dolphins_1h", HOUR).unwrap();
        assert!(lock_path.exists());
        assert_eq!(read_info(&lock_path).unwrap().group, "ci01_dolphins_1h");

        drop(lock);
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_double_lock_fails_naming_holder() {
        let _guard = registry();
        let temp_dir = TempDir::new().unwrap();

        let _lock1 = FileLock::acquire(temp_dir.path(), "g", HOUR).unwrap();
        let err = FileLock::acquire(temp_dir.path(), "g", HOUR).unwrap_err();
        assert!(matches!(err, Error::FileLocked { .. }));
        assert!(
            err.to_string()
                .contains(&format!("pid {}", std::process::id()))
        );
    }

    #[test]
    fn test_fresh_foreign_lock_is_kept() {
        let _guard = registry();
        let temp_dir = TempDir::new().unwrap();
        write_lock(temp_dir.path(), 1, "elsewhere.example", Utc::now());

        let err = FileLock::acquire(temp_dir.path(), "g", HOUR).unwrap_err();
        assert!(err.to_string().contains("elsewhere.example"));
        assert!(FileLock::lock_path_for(temp_dir.path()).exists());
    }

    #[test]
    fn test_old_lock_is_taken_over() {
        let _guard = registry();
        let temp_dir = TempDir::new().unwrap();
        let started = "2001-01-01T00:00:00Z".parse().unwrap();
        write_lock(temp_dir.path(), 1, "elsewhere.example", started);

        let lock = FileLock::acquire(temp_dir.path(), "mine", HOUR).unwrap();
        let info = read_info(&FileLock::lock_path_for(temp_dir.path())).unwrap();
        assert_eq!(info.group, "mine");
        assert_eq!(info.pid, std::process::id());
        drop(lock);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_dead_local_process_lock_is_taken_over() {
        let _guard = registry();
        let temp_dir = TempDir::new().unwrap();
        // Above the kernel's pid_max ceiling, so never a live process.
        write_lock(temp_dir.path(), 4_294_967, &current_hostname(), Utc::now());

        let lock = FileLock::acquire(temp_dir.path(), "g", HOUR).unwrap();
        drop(lock);
        assert!(!FileLock::lock_path_for(temp_dir.path()).exists());
    }

    #[test]
    fn test_unreadable_fresh_lock_is_not_stale() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = FileLock::lock_path_for(temp_dir.path());
        File::create(&lock_path).unwrap();
        assert!(!FileLock::is_stale(&lock_path, HOUR));
    }

    #[test]
    fn test_lock_path_format() {
        let path = FileLock::lock_path_for(Path::new("/out/clips/g"));
        assert_eq!(path.to_string_lossy(), "/out/clips/g/.sanctclip.lock");
    }

    #[test]
    fn test_cleanup_all_locks_removes_registered_files() {
        let _guard = registry();
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join(LOCK_FILE_NAME);

        File::create(&lock_path).unwrap();
        assert!(lock_path.exists());

        register_lock(&lock_path);
        cleanup_all_locks();

        assert!(!lock_path.exists());
    }
}
