//! Exclusive `<file>.lock` files
//!
//! A writer creates `<target>.lock` with create-new semantics, writes the full
//! new content into it, and renames it over the target. Readers therefore see
//! either the old or the new content, never a partial one. A lock file that
//! already exists means another writer holds the target.

use crate::errors::{Result, StorageContext};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_SUFFIX: &str = ".lock";

#[derive(Debug)]
pub struct LockFile {
    target: PathBuf,
    lock_path: PathBuf,
    file: Option<File>,
}

impl LockFile {
    /// Take the lock for `target`, creating parent directories as needed
    pub fn acquire(target: &Path) -> Result<Self> {
        let lock_path = Self::lock_path_for(target);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create directory {}", parent.display())
            })?;
        }

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .with_context(|| format!("Unable to lock {}", target.display()))?;

        Ok(LockFile {
            target: target.to_path_buf(),
            lock_path,
            file: Some(file),
        })
    }

    pub fn lock_path_for(target: &Path) -> PathBuf {
        let mut lock_path = target.as_os_str().to_owned();
        lock_path.push(LOCK_SUFFIX);
        PathBuf::from(lock_path)
    }

    pub fn is_lock_path(path: &Path) -> bool {
        path.extension().is_some_and(|extension| extension == "lock")
    }

    pub fn write_all(&mut self, content: &[u8]) -> Result<()> {
        let lock_path = &self.lock_path;
        if let Some(file) = self.file.as_mut() {
            file.write_all(content)
                .with_context(|| format!("Unable to write {}", lock_path.display()))?;
        }

        Ok(())
    }

    /// Flush the new content and rename it over the target
    pub fn commit(mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()
                .with_context(|| format!("Unable to flush {}", self.lock_path.display()))?;
        }

        std::fs::rename(&self.lock_path, &self.target).with_context(|| {
            format!(
                "Unable to rename {} to {}",
                self.lock_path.display(),
                self.target.display()
            )
        })?;
        // nothing left to clean up
        self.lock_path = PathBuf::new();

        Ok(())
    }

    /// Release the lock without touching the target
    pub fn rollback(self) {
        drop(self)
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.file.take();
        if !self.lock_path.as_os_str().is_empty() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
