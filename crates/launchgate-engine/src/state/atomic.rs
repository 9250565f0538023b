use anyhow::{bail, Context, Result};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::Duration;

/// Seconds after which a lock file left by a dead process is ignored.
const STALE_LOCK_SECS: i64 = 60;

/// Write content atomically: write to temp file, fsync, rename.
pub fn atomic_write(path: &str, content: &[u8]) -> Result<()> {
    let dir = Path::new(path).parent().unwrap_or(Path::new("."));
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create directory {}", dir.display()))?;
    let temp_path = dir.join(format!(".{}.tmp", temp_suffix()));

    let mut file = std::fs::File::create(&temp_path)
        .with_context(|| format!("cannot create temp file for {path}"))?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, path).with_context(|| format!("cannot rename temp to {path}"))?;

    Ok(())
}

/// Advisory lock for a store file. Prevents concurrent writers.
///
/// Creates a .lock file alongside the store file holding the PID and
/// timestamp. Creation is exclusive, so two holders cannot coexist.
#[derive(Debug)]
pub struct AdvisoryLock {
    lock_path: String,
}

impl AdvisoryLock {
    /// Acquire an advisory lock. Returns error if lock is already held.
    pub fn acquire(store_path: &str) -> Result<Self> {
        let lock_path = format!("{store_path}.lock");
        if let Some(parent) = Path::new(&lock_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create directory {}", parent.display()))?;
            }
        }

        if is_stale(&lock_path) {
            let _ = std::fs::remove_file(&lock_path);
        }

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                bail!("store is locked by another process (lock: {lock_path})")
            }
            Err(e) => {
                return Err(e).with_context(|| format!("cannot acquire lock {lock_path}"));
            }
        };

        let pid = std::process::id();
        let ts = chrono::Utc::now().timestamp();
        file.write_all(format!("{pid}\n{ts}\n").as_bytes())
            .with_context(|| format!("cannot write lock {lock_path}"))?;

        Ok(Self { lock_path })
    }

    /// Acquire the lock, retrying while another writer holds it.
    pub fn acquire_with_retry(store_path: &str, attempts: u32, pause: Duration) -> Result<Self> {
        let mut last_err = None;
        for _ in 0..attempts.max(1) {
            match Self::acquire(store_path) {
                Ok(lock) => return Ok(lock),
                Err(e) => {
                    last_err = Some(e);
                    std::thread::sleep(pause);
                }
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => bail!("cannot acquire lock for {store_path}"),
        }
    }

    /// Release the advisory lock.
    pub fn release(self) -> Result<()> {
        if Path::new(&self.lock_path).exists() {
            std::fs::remove_file(&self.lock_path)
                .with_context(|| format!("cannot release lock {}", self.lock_path))?;
        }
        Ok(())
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

fn is_stale(lock_path: &str) -> bool {
    let Ok(content) = std::fs::read_to_string(lock_path) else {
        return false;
    };
    let Some(ts) = content.lines().nth(1).and_then(|l| l.parse::<i64>().ok()) else {
        return false;
    };
    chrono::Utc::now().timestamp() - ts > STALE_LOCK_SECS
}

/// Unique-enough suffix for temp file names.
fn temp_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{}-{nanos:x}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn atomic_write_creates_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        atomic_write(path, b"hello world").unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "hello world");
    }

    #[test]
    fn atomic_write_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/store.json");
        atomic_write(path.to_str().unwrap(), b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn advisory_lock_acquire_and_release() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        let lock = AdvisoryLock::acquire(path).unwrap();
        assert!(Path::new(&format!("{path}.lock")).exists());

        lock.release().unwrap();
        assert!(!Path::new(&format!("{path}.lock")).exists());
    }

    #[test]
    fn advisory_lock_blocks_concurrent() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        let _lock1 = AdvisoryLock::acquire(path).unwrap();
        let result = AdvisoryLock::acquire(path);
        assert!(result.is_err());
    }

    #[test]
    fn stale_lock_is_taken_over() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let old = chrono::Utc::now().timestamp() - 3600;
        std::fs::write(format!("{path}.lock"), format!("1\n{old}\n")).unwrap();

        let lock = AdvisoryLock::acquire(path);
        assert!(lock.is_ok());
    }

    #[test]
    fn advisory_lock_drop_releases() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        {
            let _lock = AdvisoryLock::acquire(&path).unwrap();
            assert!(Path::new(&format!("{path}.lock")).exists());
        }
        assert!(!Path::new(&format!("{path}.lock")).exists());

        let _lock2 = AdvisoryLock::acquire(&path).unwrap();
    }

    #[test]
    fn retry_waits_for_release() {
        use std::sync::{Arc, Barrier};

        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let held = AdvisoryLock::acquire(&path).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let b = Arc::clone(&barrier);
        let p = path.clone();
        let waiter = std::thread::spawn(move || {
            b.wait();
            AdvisoryLock::acquire_with_retry(&p, 200, Duration::from_millis(5)).is_ok()
        });

        barrier.wait();
        std::thread::sleep(Duration::from_millis(20));
        held.release().unwrap();
        assert!(waiter.join().unwrap());
    }
}
